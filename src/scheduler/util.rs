use super::SchedError;
use crate::model::{
    AssignmentId, Batch, BatchId, ClassId, Mentor, MentorAssignment, MentorId, Registry, Session,
    SessionId,
};
use chrono::{DateTime, Utc};

pub(super) fn require_mentor<'a>(registry: &'a Registry, id: &MentorId) -> Result<&'a Mentor, SchedError> {
    registry
        .find_mentor(id)
        .ok_or_else(|| SchedError::UnknownMentor(id.to_string()))
}

pub(super) fn require_batch<'a>(registry: &'a Registry, id: &BatchId) -> Result<&'a Batch, SchedError> {
    registry
        .find_batch(id)
        .ok_or_else(|| SchedError::UnknownBatch(id.to_string()))
}

pub(super) fn require_assignment<'a>(
    registry: &'a Registry,
    id: &AssignmentId,
) -> Result<&'a MentorAssignment, SchedError> {
    registry
        .find_assignment(id)
        .ok_or_else(|| SchedError::UnknownAssignment(id.to_string()))
}

pub(super) fn require_active_assignment<'a>(
    registry: &'a Registry,
    id: &AssignmentId,
) -> Result<&'a MentorAssignment, SchedError> {
    let assignment = require_assignment(registry, id)?;
    if !assignment.is_active {
        return Err(SchedError::validation(format!(
            "assignment {id} is no longer active"
        )));
    }
    Ok(assignment)
}

/// Séance + affectation propriétaire.
pub(super) fn require_session<'a>(
    registry: &'a Registry,
    id: &SessionId,
) -> Result<(&'a Session, &'a MentorAssignment), SchedError> {
    let session = registry
        .find_session(id)
        .ok_or_else(|| SchedError::UnknownSession(id.to_string()))?;
    let assignment = require_assignment(registry, &session.assignment)?;
    Ok((session, assignment))
}

/// Un mentor n'a qu'une affectation active par classe.
pub(super) fn ensure_single_class_assignment(
    registry: &Registry,
    mentor: &MentorId,
    class: &ClassId,
    ignore: Option<&AssignmentId>,
) -> Result<(), SchedError> {
    let existing = registry.assignments.iter().find(|a| {
        a.is_active
            && &a.mentor == mentor
            && Some(&a.id) != ignore
            && registry
                .find_batch(&a.batch)
                .map_or(false, |b| &b.class == class)
    });
    if let Some(a) = existing {
        let batch = registry
            .find_batch(&a.batch)
            .map_or_else(|| a.batch.to_string(), |b| b.name.clone());
        return Err(SchedError::DuplicateAssignment(format!(
            "mentor {mentor} is already assigned to batch {batch} in this class."
        )));
    }
    Ok(())
}

pub(super) fn next_session_number(registry: &Registry, assignment: &AssignmentId) -> u32 {
    registry
        .sessions
        .iter()
        .filter(|s| &s.assignment == assignment)
        .map(|s| s.number)
        .max()
        .map_or(1, |n| n + 1)
}

pub(super) fn push_sessions(
    registry: &mut Registry,
    assignment: &AssignmentId,
    first_number: u32,
    instants: &[DateTime<Utc>],
) {
    for (number, at) in (first_number..).zip(instants.iter().copied()) {
        registry
            .sessions
            .push(Session::new(assignment.clone(), number, at));
    }
}
