#![forbid(unsafe_code)]
mod common;

use common::{mentor, mondays, seed_batch, utc, weekly};
use mentorat::{ErrorKind, SchedError, Scheduler};

#[test]
fn same_instant_for_same_mentor_is_a_collision() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    s.create_assignment(&m, &b1, &mondays(4)).unwrap();

    let before = s.registry().clone();
    // même lundi 10:00, sur deux semaines seulement : une égalité suffit
    let err = s.create_assignment(&m, &b2, &weekly("2025-01-20", 0, "10:00", 2)).unwrap_err();
    match &err {
        SchedError::Collision(c) => {
            assert_eq!(c.at, utc(2025, 1, 20, 4, 30));
            assert_eq!(c.class_name, "CSE 2025");
            assert_eq!(c.batch_name, "B1");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Schedule conflict detected! Mentor is already assigned to CSE 2025 - B1 at one of the selected times."
    );
    assert_eq!(err.to_response()["conflict"], true);
    assert_eq!(s.registry(), &before);
}

#[test]
fn different_minute_is_not_a_collision() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    s.create_assignment(&m, &b1, &mondays(4)).unwrap();
    s.create_assignment(&m, &b2, &weekly("2025-01-06", 0, "10:01", 4)).unwrap();
    assert_eq!(s.registry().sessions.len(), 8);
}

#[test]
fn other_mentors_do_not_collide() {
    let mut s = Scheduler::new();
    let a = mentor(&mut s, "Dr. Rao");
    let b = mentor(&mut s, "Dr. Iyer");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    s.create_assignment(&a, &b1, &mondays(4)).unwrap();
    s.create_assignment(&b, &b2, &mondays(4)).unwrap();
}

#[test]
fn collision_is_symmetric() {
    let zone = chrono_tz::Asia::Kolkata;
    let x = mondays(6);
    let y = weekly("2025-01-27", 0, "10:00", 3);

    for (existing, candidate) in [(&x, &y), (&y, &x)] {
        let mut s = Scheduler::new();
        let m = mentor(&mut s, "Dr. Rao");
        let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
        s.create_assignment(&m, &b1, existing).unwrap();
        let candidates = candidate.instants(zone).unwrap();
        assert!(s.find_collision(&m, &candidates, None).is_some());
    }
}

#[test]
fn own_assignment_can_be_excluded() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &b1, &mondays(4)).unwrap();
    let candidates = mondays(4).instants(s.zone()).unwrap();
    assert!(s.find_collision(&m, &candidates, None).is_some());
    assert!(s.find_collision(&m, &candidates, Some(&id)).is_none());
}

#[test]
fn past_sessions_of_inactive_assignments_still_collide() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    let id = s.create_assignment(&m, &b1, &mondays(4)).unwrap();
    // deux séances passées, l'affectation reste inactive
    s.unassign(&id, utc(2025, 1, 15, 0, 0)).unwrap();
    assert!(!s.registry().find_assignment(&id).unwrap().is_active);

    let err = s.create_assignment(&m, &b2, &mondays(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn capacity_over_ceiling_is_rejected() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, full) = seed_batch(&mut s, "CSE 2025", 45);
    let (_, one) = seed_batch(&mut s, "ECE 2025", 1);
    s.create_assignment(&m, &full, &mondays(2)).unwrap();

    let before = s.registry().clone();
    let err = s
        .create_assignment(&m, &one, &weekly("2025-01-07", 1, "10:00", 2))
        .unwrap_err();
    match err {
        SchedError::Capacity {
            current_load,
            candidate_size,
            ceiling,
            ..
        } => assert_eq!((current_load, candidate_size, ceiling), (45, 1, 45)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.registry(), &before);
}

#[test]
fn capacity_at_ceiling_is_accepted() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, big) = seed_batch(&mut s, "CSE 2025", 44);
    let (_, one) = seed_batch(&mut s, "ECE 2025", 1);
    s.create_assignment(&m, &big, &mondays(2)).unwrap();
    s.create_assignment(&m, &one, &weekly("2025-01-07", 1, "10:00", 2)).unwrap();
    assert_eq!(s.registry().mentor_load(&m), 45);
}

#[test]
fn capacity_check_is_read_only() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b40) = seed_batch(&mut s, "CSE 2025", 40);
    let (_, b5) = seed_batch(&mut s, "ECE 2025", 5);
    let (_, b6) = seed_batch(&mut s, "ME 2025", 6);
    s.create_assignment(&m, &b40, &mondays(2)).unwrap();

    assert!(s.check_capacity(&m, &b5).is_ok());
    let err = s.check_capacity(&m, &b6).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert_eq!(err.to_response()["error"], "capacity");
}

#[test]
fn inactive_assignments_do_not_count_towards_load() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 45);
    let id = s.create_assignment(&m, &b1, &mondays(4)).unwrap();
    s.unassign(&id, utc(2025, 1, 15, 0, 0)).unwrap();
    assert_eq!(s.registry().mentor_load(&m), 0);
}
