use super::{util, AttendanceMark, AttendanceStatus, Env, LeaveDecision, SchedError};
use crate::model::{
    Absence, LeaveRequest, LeaveRequestId, LeaveStatus, MenteeId, MentorId, Registry, SessionId,
    SessionStatus,
};
use crate::notification::{Notification, Recipient};
use chrono::{DateTime, Utc};
use tracing::info;

pub(super) fn request_leave(
    registry: &mut Registry,
    env: &Env<'_>,
    session: &SessionId,
    mentee: &MenteeId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<LeaveRequestId, SchedError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(SchedError::validation("A reason for the leave is required."));
    }
    let (target, assignment) = util::require_session(registry, session)?;
    let student = registry
        .find_mentee(mentee)
        .ok_or_else(|| SchedError::UnknownMentee(mentee.to_string()))?;
    if student.batch.as_ref() != Some(&assignment.batch) {
        return Err(SchedError::Forbidden("student is not part of this session's batch"));
    }
    if matches!(target.status, SessionStatus::Completed | SessionStatus::Missed) {
        return Err(SchedError::validation("session is already over"));
    }
    if registry
        .leave_requests
        .iter()
        .any(|r| &r.session == session && &r.mentee == mentee)
    {
        return Err(SchedError::DuplicateLeave);
    }

    let local = target.start_time.with_timezone(&env.zone);
    let message = env.renderer.leave_requested(&student.name, &local);
    let notice = Notification::new(Recipient::Mentor(assignment.mentor.clone()), message, now);

    let request = LeaveRequest {
        id: LeaveRequestId::random(),
        session: session.clone(),
        mentee: mentee.clone(),
        reason: reason.to_string(),
        status: LeaveStatus::Pending,
        requested_at: now,
        actioned_at: None,
    };
    let id = request.id.clone();
    registry.insert_leave(request)?;
    registry.notifications.push(notice);

    info!(leave = %id, session = %session, mentee = %mentee, "leave requested");
    Ok(id)
}

/// En attente → approuvée / refusée, par le mentor de la séance.
pub(super) fn action_leave(
    registry: &mut Registry,
    env: &Env<'_>,
    request: &LeaveRequestId,
    mentor: &MentorId,
    decision: LeaveDecision,
    now: DateTime<Utc>,
) -> Result<LeaveStatus, SchedError> {
    let current = registry
        .find_leave(request)
        .ok_or_else(|| SchedError::UnknownLeaveRequest(request.to_string()))?;
    let (target, assignment) = util::require_session(registry, &current.session)?;
    if &assignment.mentor != mentor {
        return Err(SchedError::Forbidden("leave request belongs to another mentor's session"));
    }
    if current.status != LeaveStatus::Pending {
        return Err(SchedError::validation("leave request has already been actioned"));
    }

    let status = match decision {
        LeaveDecision::Approve => LeaveStatus::Approved,
        LeaveDecision::Decline => LeaveStatus::Declined,
    };
    let local = target.start_time.with_timezone(&env.zone);
    let message = env.renderer.leave_actioned(status, &local);
    let notice = Notification::new(Recipient::Mentee(current.mentee.clone()), message, now);

    if let Some(r) = registry.find_leave_mut(request) {
        r.status = status;
        r.actioned_at = Some(now);
    }
    registry.notifications.push(notice);

    info!(leave = %request, ?status, "leave request actioned");
    Ok(status)
}

/// L'absence est enregistrée ; la présence efface l'enregistrement.
pub(super) fn mark_attendance(
    registry: &mut Registry,
    session: &SessionId,
    mentor: &MentorId,
    mentee: &MenteeId,
    mark: AttendanceMark,
) -> Result<(), SchedError> {
    let (_, assignment) = util::require_session(registry, session)?;
    if &assignment.mentor != mentor {
        return Err(SchedError::Forbidden("session belongs to another mentor"));
    }
    if registry.find_mentee(mentee).is_none() {
        return Err(SchedError::UnknownMentee(mentee.to_string()));
    }

    let recorded = registry
        .absences
        .iter()
        .any(|a| &a.session == session && &a.mentee == mentee);
    match mark {
        AttendanceMark::Absent if !recorded => registry.absences.push(Absence {
            session: session.clone(),
            mentee: mentee.clone(),
        }),
        AttendanceMark::Absent => {}
        AttendanceMark::Present => registry
            .absences
            .retain(|a| !(&a.session == session && &a.mentee == mentee)),
    }
    Ok(())
}

pub(super) fn attendance_status(
    registry: &Registry,
    session: &SessionId,
    mentee: &MenteeId,
) -> AttendanceStatus {
    let on_leave = registry.leave_requests.iter().any(|r| {
        &r.session == session && &r.mentee == mentee && r.status == LeaveStatus::Approved
    });
    if on_leave {
        return AttendanceStatus::LeaveApproved;
    }
    if registry
        .absences
        .iter()
        .any(|a| &a.session == session && &a.mentee == mentee)
    {
        return AttendanceStatus::Absent;
    }
    AttendanceStatus::Present
}
