use super::{calendar::RecurrenceSpec, capacity, conflicts, util, Env, SchedError};
use crate::model::{AssignmentId, BatchId, MentorAssignment, MentorId, Registry};
use tracing::info;

/// Non affecté → actif : capacité, unicité dans la classe, puis collisions,
/// et enfin écriture de l'affectation et de ses séances numérotées 1..N.
pub(super) fn create_assignment(
    registry: &mut Registry,
    env: &Env<'_>,
    mentor: &MentorId,
    batch: &BatchId,
    recurrence: &RecurrenceSpec,
) -> Result<AssignmentId, SchedError> {
    util::require_mentor(registry, mentor)?;
    let target = util::require_batch(registry, batch)?;
    let class = target.class.clone();
    let batch_name = target.name.clone();

    if registry.active_assignment_for_batch(batch).is_some() {
        return Err(SchedError::DuplicateAssignment(format!(
            "batch {batch_name} already has an active mentor."
        )));
    }

    capacity::check_capacity(registry, mentor, batch, env.policy.mentee_ceiling)?;
    util::ensure_single_class_assignment(registry, mentor, &class, None)?;

    let instants = recurrence.instants(env.zone)?;
    if let Some(conflict) = conflicts::find_collision(registry, mentor, &instants, None) {
        return Err(SchedError::Collision(conflict));
    }

    let assignment = MentorAssignment::new(mentor.clone(), batch.clone());
    let id = assignment.id.clone();
    registry.insert_assignment(assignment)?;
    util::push_sessions(registry, &id, 1, &instants);

    info!(
        assignment = %id,
        mentor = %mentor,
        batch = %batch_name,
        sessions = instants.len(),
        "mentor assigned and sessions scheduled"
    );
    Ok(id)
}
