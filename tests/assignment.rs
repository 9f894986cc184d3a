#![forbid(unsafe_code)]
mod common;

use common::{mentor, mondays, seed_batch, utc, weekly};
use mentorat::model::{Mentee, SessionStatus};
use mentorat::{ErrorKind, Scheduler, UpdateAction};

#[test]
fn create_assignment_schedules_numbered_sessions() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 22);

    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();
    let r = s.registry();
    let a = r.active_assignment_for_batch(&batch).unwrap();
    assert_eq!(a.id, id);
    assert_eq!(a.mentor, m);

    let sessions = r.sessions_for_assignment(&id);
    let numbers: Vec<u32> = sessions.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(sessions.iter().all(|s| s.status == SessionStatus::Upcoming));
    assert_eq!(sessions[0].start_time, utc(2025, 1, 6, 4, 30));
    assert_eq!(sessions[3].start_time, utc(2025, 1, 27, 4, 30));
    assert_eq!(r.mentor_load(&m), 22);
}

#[test]
fn one_batch_per_class_per_mentor() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let class = s.add_class("CSE 2025").unwrap();
    for i in 0..40 {
        s.add_mentee(Mentee::new(format!("R{i:03}"), format!("S{i}"), class.clone()))
            .unwrap();
    }
    let batches = s.auto_batch(&class).unwrap();
    s.create_assignment(&m, &batches[0], &mondays(2)).unwrap();

    let err = s
        .create_assignment(&m, &batches[1], &weekly("2025-01-07", 1, "10:00", 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert!(err.to_string().contains("already assigned to batch B1"));
}

#[test]
fn batch_with_an_active_mentor_is_rejected() {
    let mut s = Scheduler::new();
    let a = mentor(&mut s, "Dr. Rao");
    let b = mentor(&mut s, "Dr. Iyer");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    s.create_assignment(&a, &batch, &mondays(2)).unwrap();
    let err = s
        .create_assignment(&b, &batch, &weekly("2025-01-07", 1, "10:00", 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[test]
fn unknown_references_are_not_found() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let ghost = mentorat::model::MentorId::new("ghost");
    let err = s.create_assignment(&ghost, &batch, &mondays(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = s
        .create_assignment(&m, &mentorat::model::BatchId::new("nope"), &mondays(1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn unassign_before_any_session_removes_everything() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();

    s.unassign(&id, utc(2025, 1, 1, 0, 0)).unwrap();
    assert!(s.registry().find_assignment(&id).is_none());
    assert!(s.registry().sessions.is_empty());
    assert!(s.registry().active_assignment_for_batch(&batch).is_none());
}

#[test]
fn unassign_keeps_past_sessions() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();

    let now = utc(2025, 1, 15, 0, 0);
    s.unassign(&id, now).unwrap();
    let r = s.registry();
    assert!(!r.find_assignment(&id).unwrap().is_active);
    assert!(r.active_assignment_for_batch(&batch).is_none());
    assert!(r.sessions_after(&id, now).is_empty());
    assert_eq!(r.sessions_for_assignment(&id).len(), 2);

    // une seconde tentative vise une affectation inactive
    assert_eq!(s.unassign(&id, now).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn reschedule_replaces_only_future_sessions() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();

    let now = utc(2025, 1, 15, 0, 0);
    s.reschedule(&id, &weekly("2025-01-15", 2, "14:00", 3), now).unwrap();

    let r = s.registry();
    let sessions = r.sessions_for_assignment(&id);
    let summary: Vec<(u32, _)> = sessions.iter().map(|s| (s.number, s.start_time)).collect();
    assert_eq!(
        summary,
        vec![
            (1, utc(2025, 1, 6, 4, 30)),
            (2, utc(2025, 1, 13, 4, 30)),
            (3, utc(2025, 1, 15, 8, 30)),
            (4, utc(2025, 1, 22, 8, 30)),
            (5, utc(2025, 1, 29, 8, 30)),
        ]
    );
    assert!(r.find_assignment(&id).unwrap().is_active);
}

#[test]
fn reschedule_onto_its_own_slot_is_not_a_collision() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();
    s.reschedule(&id, &mondays(6), utc(2025, 1, 1, 0, 0)).unwrap();
    assert_eq!(s.registry().sessions_for_assignment(&id).len(), 6);
}

#[test]
fn reschedule_repeating_a_past_session_is_rejected() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&m, &batch, &mondays(4)).unwrap();

    // les 6 et 13 janvier sont passés et conservés
    let now = utc(2025, 1, 15, 0, 0);
    let before = s.registry().clone();
    let err = s.reschedule(&id, &mondays(4), now).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_response()["error"], "validation");
    assert_eq!(s.registry(), &before);

    let mut starts: Vec<_> = s
        .registry()
        .sessions_for_assignment(&id)
        .iter()
        .map(|x| x.start_time)
        .collect();
    starts.dedup();
    assert_eq!(starts.len(), 4);
}

#[test]
fn reschedule_collision_with_another_batch_writes_nothing() {
    let mut s = Scheduler::new();
    let m = mentor(&mut s, "Dr. Rao");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    s.create_assignment(&m, &b1, &mondays(4)).unwrap();
    let id = s.create_assignment(&m, &b2, &weekly("2025-01-07", 1, "10:00", 4)).unwrap();

    let before = s.registry().clone();
    let err = s.reschedule(&id, &mondays(2), utc(2025, 1, 1, 0, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(s.registry(), &before);
}

#[test]
fn reassign_moves_the_batch_to_a_new_mentor() {
    let mut s = Scheduler::new();
    let old = mentor(&mut s, "Dr. Rao");
    let new = mentor(&mut s, "Dr. Iyer");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&old, &batch, &mondays(4)).unwrap();

    let now = utc(2025, 1, 15, 0, 0);
    let new_id = s.reassign(&id, &new, &weekly("2025-01-16", 3, "09:00", 3), now).unwrap();

    let r = s.registry();
    let previous = r.find_assignment(&id).unwrap();
    assert!(!previous.is_active);
    assert_eq!(r.sessions_for_assignment(&id).len(), 2);

    let current = r.active_assignment_for_batch(&batch).unwrap();
    assert_eq!(current.id, new_id);
    assert_eq!(current.mentor, new);
    let numbers: Vec<u32> = r.sessions_for_assignment(&new_id).iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(r.mentor_load(&old), 0);
    assert_eq!(r.mentor_load(&new), 20);
}

#[test]
fn reassign_collision_leaves_old_assignment_intact() {
    let mut s = Scheduler::new();
    let old = mentor(&mut s, "Dr. Rao");
    let new = mentor(&mut s, "Dr. Iyer");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    let id = s.create_assignment(&old, &b1, &mondays(4)).unwrap();
    s.create_assignment(&new, &b2, &weekly("2025-01-20", 0, "10:00", 2)).unwrap();

    let before = s.registry().clone();
    let err = s.reassign(&id, &new, &mondays(4), utc(2025, 1, 1, 0, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(s.registry(), &before);
    assert!(s.registry().find_assignment(&id).unwrap().is_active);
    assert_eq!(s.registry().sessions_for_assignment(&id).len(), 4);
}

#[test]
fn reassign_checks_the_new_mentor() {
    let mut s = Scheduler::new();
    let old = mentor(&mut s, "Dr. Rao");
    let busy = mentor(&mut s, "Dr. Iyer");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 30);
    let id = s.create_assignment(&old, &b1, &mondays(4)).unwrap();
    s.create_assignment(&busy, &b2, &weekly("2025-01-07", 1, "10:00", 2)).unwrap();

    let now = utc(2025, 1, 1, 0, 0);
    let err = s.reassign(&id, &busy, &mondays(4), now).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);
    let err = s.reassign(&id, &old, &mondays(4), now).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn update_assignment_dispatches_each_action() {
    let mut s = Scheduler::new();
    let a = mentor(&mut s, "Dr. Rao");
    let b = mentor(&mut s, "Dr. Iyer");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&a, &batch, &mondays(4)).unwrap();
    let now = utc(2025, 1, 1, 0, 0);

    let kept = s
        .update_assignment(&id, UpdateAction::Reschedule(mondays(2)), now)
        .unwrap();
    assert_eq!(kept, Some(id.clone()));

    let moved = s
        .update_assignment(
            &id,
            UpdateAction::Reassign {
                mentor: b.clone(),
                recurrence: mondays(2),
            },
            now,
        )
        .unwrap()
        .unwrap();
    assert_ne!(moved, id);

    assert_eq!(s.update_assignment(&moved, UpdateAction::Unassign, now).unwrap(), None);
    assert!(s.registry().active_assignment_for_batch(&batch).is_none());
}

#[test]
fn substitute_takes_over_then_hands_back() {
    let mut s = Scheduler::new();
    let owner = mentor(&mut s, "Dr. Rao");
    let sub = mentor(&mut s, "Dr. Iyer");
    let (_, batch) = seed_batch(&mut s, "CSE 2025", 20);
    let id = s.create_assignment(&owner, &batch, &mondays(4)).unwrap();
    let d = |day| chrono::NaiveDate::from_ymd_opt(2025, 1, day).unwrap();

    s.assign_substitute(&id, &sub, d(10), d(20)).unwrap();
    let a = s.registry().find_assignment(&id).unwrap();
    assert!(a.is_temporary);
    assert_eq!(a.mentor, sub);
    assert_eq!(a.original_mentor.as_ref(), Some(&owner));
    assert_eq!(s.registry().mentor_load(&sub), 20);

    // déjà remplacé
    assert_eq!(
        s.assign_substitute(&id, &owner, d(10), d(20)).unwrap_err().kind(),
        ErrorKind::Validation
    );

    s.end_substitution(&id).unwrap();
    let a = s.registry().find_assignment(&id).unwrap();
    assert!(!a.is_temporary);
    assert_eq!(a.mentor, owner);
    assert!(a.original_mentor.is_none());
}

#[test]
fn substitute_with_a_clash_in_the_window_is_rejected() {
    let mut s = Scheduler::new();
    let owner = mentor(&mut s, "Dr. Rao");
    let sub = mentor(&mut s, "Dr. Iyer");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    let id = s.create_assignment(&owner, &b1, &mondays(4)).unwrap();
    s.create_assignment(&sub, &b2, &weekly("2025-01-13", 0, "10:00", 1)).unwrap();
    let d = |day| chrono::NaiveDate::from_ymd_opt(2025, 1, day).unwrap();

    let before = s.registry().clone();
    let err = s.assign_substitute(&id, &sub, d(10), d(20)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(s.registry(), &before);
}

#[test]
fn substitute_clash_outside_the_window_is_still_rejected() {
    let mut s = Scheduler::new();
    let owner = mentor(&mut s, "Dr. Rao");
    let sub = mentor(&mut s, "Dr. Iyer");
    let (_, b1) = seed_batch(&mut s, "CSE 2025", 20);
    let (_, b2) = seed_batch(&mut s, "ECE 2025", 20);
    let id = s.create_assignment(&owner, &b1, &mondays(4)).unwrap();
    s.create_assignment(&sub, &b2, &weekly("2025-01-27", 0, "10:00", 1)).unwrap();
    let d = |day| chrono::NaiveDate::from_ymd_opt(2025, 1, day).unwrap();

    // le remplaçant prend toute l'affectation, y compris le 27
    let before = s.registry().clone();
    let err = s.assign_substitute(&id, &sub, d(6), d(6)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(s.registry(), &before);
    let clash = utc(2025, 1, 27, 4, 30);
    let owned_by_sub = s
        .registry()
        .sessions
        .iter()
        .filter(|x| x.start_time == clash)
        .filter(|x| s.registry().find_assignment(&x.assignment).map(|a| &a.mentor) == Some(&sub))
        .count();
    assert_eq!(owned_by_sub, 1);
}
