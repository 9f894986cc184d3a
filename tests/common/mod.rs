#![allow(dead_code)]
use chrono::{DateTime, TimeZone, Utc};
use mentorat::{
    model::{Batch, BatchId, ClassId, Mentee, Mentor, MentorId},
    RecurrenceSpec, Scheduler,
};

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Classe + batch « B1 » de `size` étudiants, posés directement dans le registre.
pub fn seed_batch(s: &mut Scheduler, class_name: &str, size: usize) -> (ClassId, BatchId) {
    let class = s.add_class(class_name).unwrap();
    let batch = Batch::new("B1", class.clone());
    let batch_id = batch.id.clone();
    let registry = s.registry_mut();
    registry.batches.push(batch);
    for i in 0..size {
        let mut m = Mentee::new(format!("{class_name}-{i:03}"), format!("Student {i}"), class.clone());
        m.batch = Some(batch_id.clone());
        registry.mentees.push(m);
    }
    (class, batch_id)
}

pub fn mentor(s: &mut Scheduler, name: &str) -> MentorId {
    s.add_mentor(Mentor::new(name)).unwrap()
}

pub fn weekly(start: &str, weekday: u8, time: &str, weeks: u32) -> RecurrenceSpec {
    RecurrenceSpec::parse(start, weekday, time, weeks).unwrap()
}

/// Lundis 10:00 (Asia/Kolkata) à partir du 6 janvier 2025, soit 04:30 UTC.
pub fn mondays(weeks: u32) -> RecurrenceSpec {
    weekly("2025-01-06", 0, "10:00", weeks)
}
