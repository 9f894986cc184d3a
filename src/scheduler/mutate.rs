use super::{calendar::RecurrenceSpec, capacity, conflicts, util, Env, SchedError, UpdateAction};
use crate::model::{AssignmentId, MentorAssignment, MentorId, Registry, SessionStatus};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

pub(super) fn update_assignment(
    registry: &mut Registry,
    env: &Env<'_>,
    id: &AssignmentId,
    action: UpdateAction,
    now: DateTime<Utc>,
) -> Result<Option<AssignmentId>, SchedError> {
    match action {
        UpdateAction::Unassign => unassign(registry, id, now).map(|()| None),
        UpdateAction::Reschedule(recurrence) => {
            reschedule(registry, env, id, &recurrence, now).map(|()| Some(id.clone()))
        }
        UpdateAction::Reassign { mentor, recurrence } => {
            reassign(registry, env, id, &mentor, &recurrence, now).map(Some)
        }
    }
}

/// Actif → non affecté. Les séances futures sont supprimées ; la ligne
/// d'affectation aussi, sauf si des séances passées doivent être conservées.
pub(super) fn unassign(
    registry: &mut Registry,
    id: &AssignmentId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    util::require_active_assignment(registry, id)?;

    let deleted = registry.delete_future_sessions(id, now);
    let kept = registry.sessions.iter().filter(|s| &s.assignment == id).count();
    if kept == 0 {
        registry.remove_assignment(id);
    } else if let Some(a) = registry.find_assignment_mut(id) {
        a.is_active = false;
    }

    info!(assignment = %id, deleted, kept, "mentor unassigned");
    Ok(())
}

/// Même mentor, nouveau calendrier : les séances futures sont remplacées.
/// Les séances de l'affectation elle-même sont exclues de la détection,
/// mais le nouveau calendrier ne peut pas reprendre l'heure d'une séance
/// passée conservée.
pub(super) fn reschedule(
    registry: &mut Registry,
    env: &Env<'_>,
    id: &AssignmentId,
    recurrence: &RecurrenceSpec,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let mentor = util::require_active_assignment(registry, id)?.mentor.clone();

    let instants = recurrence.instants(env.zone)?;
    if let Some(conflict) = conflicts::find_collision(registry, &mentor, &instants, Some(id)) {
        return Err(SchedError::Collision(conflict));
    }
    if let Some(kept) = registry
        .sessions_for_assignment(id)
        .into_iter()
        .find(|s| s.start_time <= now && instants.contains(&s.start_time))
    {
        return Err(SchedError::validation(format!(
            "new calendar repeats past session {} at {}",
            kept.number,
            kept.start_time.to_rfc3339()
        )));
    }

    let deleted = registry.delete_future_sessions(id, now);
    let first = util::next_session_number(registry, id);
    util::push_sessions(registry, id, first, &instants);

    info!(
        assignment = %id,
        deleted,
        created = instants.len(),
        "assignment rescheduled"
    );
    Ok(())
}

/// Changement de mentor : l'ancienne affectation est désactivée (séances
/// futures supprimées) et une nouvelle est créée avec un calendrier neuf.
pub(super) fn reassign(
    registry: &mut Registry,
    env: &Env<'_>,
    id: &AssignmentId,
    new_mentor: &MentorId,
    recurrence: &RecurrenceSpec,
    now: DateTime<Utc>,
) -> Result<AssignmentId, SchedError> {
    let old = util::require_active_assignment(registry, id)?;
    let batch = old.batch.clone();
    if &old.mentor == new_mentor {
        return Err(SchedError::validation(
            "new mentor is already assigned to this batch; use reschedule instead",
        ));
    }
    util::require_mentor(registry, new_mentor)?;
    let class = util::require_batch(registry, &batch)?.class.clone();

    capacity::check_capacity(registry, new_mentor, &batch, env.policy.mentee_ceiling)?;
    util::ensure_single_class_assignment(registry, new_mentor, &class, Some(id))?;

    let instants = recurrence.instants(env.zone)?;
    if let Some(conflict) = conflicts::find_collision(registry, new_mentor, &instants, Some(id)) {
        return Err(SchedError::Collision(conflict));
    }

    let deleted = registry.delete_future_sessions(id, now);
    if let Some(a) = registry.find_assignment_mut(id) {
        a.is_active = false;
    }

    let replacement = MentorAssignment::new(new_mentor.clone(), batch);
    let new_id = replacement.id.clone();
    registry.insert_assignment(replacement)?;
    util::push_sessions(registry, &new_id, 1, &instants);

    info!(
        superseded = %id,
        assignment = %new_id,
        mentor = %new_mentor,
        deleted,
        created = instants.len(),
        "batch reassigned"
    );
    Ok(new_id)
}

/// Remplacement temporaire : le mentor courant est mis de côté et le
/// remplaçant prend l'affectation, fenêtre `[from, to]` enregistrée.
/// Toutes les séances à venir passent au remplaçant, d'où une détection
/// de collision sur l'ensemble.
pub(super) fn assign_substitute(
    registry: &mut Registry,
    env: &Env<'_>,
    id: &AssignmentId,
    substitute: &MentorId,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), SchedError> {
    if to < from {
        return Err(SchedError::validation("substitution end date must not precede its start"));
    }
    let assignment = util::require_active_assignment(registry, id)?;
    if assignment.is_temporary {
        return Err(SchedError::validation("assignment already has a substitute"));
    }
    if &assignment.mentor == substitute {
        return Err(SchedError::validation("substitute must differ from the current mentor"));
    }
    let batch = assignment.batch.clone();
    util::require_mentor(registry, substitute)?;

    capacity::check_capacity(registry, substitute, &batch, env.policy.mentee_ceiling)?;

    let upcoming: Vec<DateTime<Utc>> = registry
        .sessions_for_assignment(id)
        .into_iter()
        .filter(|s| s.status == SessionStatus::Upcoming)
        .map(|s| s.start_time)
        .collect();
    if let Some(conflict) = conflicts::find_collision(registry, substitute, &upcoming, Some(id)) {
        return Err(SchedError::Collision(conflict));
    }

    if let Some(a) = registry.find_assignment_mut(id) {
        let original = std::mem::replace(&mut a.mentor, substitute.clone());
        a.original_mentor = Some(original);
        a.is_temporary = true;
        a.temp_start = Some(from);
        a.temp_end = Some(to);
    }
    info!(assignment = %id, substitute = %substitute, %from, %to, "substitute assigned");
    Ok(())
}

/// Fin du remplacement : le mentor d'origine reprend l'affectation.
pub(super) fn end_substitution(registry: &mut Registry, id: &AssignmentId) -> Result<(), SchedError> {
    let assignment = util::require_assignment(registry, id)?;
    if !assignment.is_temporary {
        return Err(SchedError::validation("assignment has no substitute"));
    }
    let original = assignment
        .original_mentor
        .clone()
        .ok_or_else(|| SchedError::validation("original mentor no longer exists"))?;
    util::require_mentor(registry, &original)?;

    if let Some(a) = registry.find_assignment_mut(id) {
        a.mentor = original;
        a.original_mentor = None;
        a.is_temporary = false;
        a.temp_start = None;
        a.temp_end = None;
    }
    info!(assignment = %id, "substitution ended");
    Ok(())
}
