use super::{util, SchedError, SweepReport};
use crate::model::{MentorId, Registry, Session, SessionId, SessionStatus};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

fn transition(session: &mut Session, next: SessionStatus) -> Result<(), SchedError> {
    if !session.status.can_transition_to(next) {
        return Err(SchedError::InvalidTransition {
            from: session.status,
            to: next,
        });
    }
    session.status = next;
    Ok(())
}

fn ensure_owner(registry: &Registry, id: &SessionId, mentor: &MentorId) -> Result<(), SchedError> {
    let (_, assignment) = util::require_session(registry, id)?;
    if &assignment.mentor != mentor {
        return Err(SchedError::Forbidden("session belongs to another mentor"));
    }
    Ok(())
}

/// À venir → en cours, dans la fenêtre `[début, début + live_window)`.
/// Sans effet sur une séance déjà démarrée.
pub(super) fn start_session(
    registry: &mut Registry,
    id: &SessionId,
    mentor: &MentorId,
    now: DateTime<Utc>,
    live_window: Duration,
) -> Result<(), SchedError> {
    ensure_owner(registry, id, mentor)?;
    let session = registry
        .find_session_mut(id)
        .ok_or_else(|| SchedError::UnknownSession(id.to_string()))?;

    if session.status == SessionStatus::InProgress {
        return Ok(());
    }
    if session.status == SessionStatus::Upcoming
        && (now < session.start_time || now >= session.start_time + live_window)
    {
        return Err(SchedError::validation(
            "session can only be started during its scheduled window",
        ));
    }
    transition(session, SessionStatus::InProgress)?;
    session.actual_start = Some(now);
    info!(session = %id, "session started");
    Ok(())
}

/// En cours → terminée.
pub(super) fn end_session(
    registry: &mut Registry,
    id: &SessionId,
    mentor: &MentorId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    ensure_owner(registry, id, mentor)?;
    let session = registry
        .find_session_mut(id)
        .ok_or_else(|| SchedError::UnknownSession(id.to_string()))?;
    transition(session, SessionStatus::Completed)?;
    session.actual_end = Some(now);
    info!(session = %id, "session completed");
    Ok(())
}

/// Balayage périodique : toute séance encore « à venir » dont le début est
/// plus ancien que `grace` passe en manquée. Idempotent ; chaque séance est
/// traitée indépendamment.
pub(super) fn sweep_missed(registry: &mut Registry, now: DateTime<Utc>, grace: Duration) -> SweepReport {
    let cutoff = now - grace;
    let candidates: Vec<SessionId> = registry
        .sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Upcoming && s.start_time < cutoff)
        .map(|s| s.id.clone())
        .collect();

    let mut report = SweepReport::default();
    for id in candidates {
        match mark_missed(registry, &id) {
            Ok(batch) => {
                info!(session = %id, batch = %batch, "session marked as missed");
                report.marked.push(id);
            }
            Err(err) => {
                warn!(session = %id, error = %err, "could not mark session as missed");
                report.failed.push((id, err.to_string()));
            }
        }
    }
    info!(
        marked = report.marked.len(),
        failed = report.failed.len(),
        "missed-session sweep done"
    );
    report
}

fn mark_missed(registry: &mut Registry, id: &SessionId) -> Result<String, SchedError> {
    let (_, assignment) = util::require_session(registry, id)?;
    let batch = registry
        .find_batch(&assignment.batch)
        .map_or_else(|| assignment.batch.to_string(), |b| b.name.clone());
    let session = registry
        .find_session_mut(id)
        .ok_or_else(|| SchedError::UnknownSession(id.to_string()))?;
    transition(session, SessionStatus::Missed)?;
    Ok(batch)
}
