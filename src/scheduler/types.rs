use super::calendar::RecurrenceSpec;
use crate::model::{AssignmentId, MentorId, SessionId, SessionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Séance existante en collision avec le calendrier candidat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub mentor: MentorId,
    pub assignment: AssignmentId,
    pub session: SessionId,
    pub at: DateTime<Utc>,
    pub batch_name: String,
    pub class_name: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schedule conflict detected! Mentor is already assigned to {} - {} at one of the selected times.",
            self.class_name, self.batch_name
        )
    }
}

/// Variantes de modification d'une affectation existante.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    Unassign,
    Reschedule(RecurrenceSpec),
    Reassign {
        mentor: MentorId,
        recurrence: RecurrenceSpec,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Approve,
    Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceMark {
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceStatus {
    LeaveApproved,
    Absent,
    Present,
}

/// Bilan du balayage des séances manquées.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub marked: Vec<SessionId>,
    pub failed: Vec<(SessionId, String)>,
}

/// Catégorie d'erreur exposée aux appelants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Conflict,
    Capacity,
    Duplicate,
    Validation,
    InsufficientPool,
    NotFound,
    Forbidden,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Conflict => "conflict",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Validation => "validation",
            ErrorKind::InsufficientPool => "insufficient_pool",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Persistence => "persistence",
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Collision(Conflict),
    #[error("Assignment failed: mentor {mentor} has {current_load} mentees. Assigning this batch of {candidate_size} would exceed the {ceiling} mentee limit.")]
    Capacity {
        mentor: MentorId,
        current_load: usize,
        candidate_size: usize,
        ceiling: usize,
    },
    #[error("Assignment failed: {0}")]
    DuplicateAssignment(String),
    #[error("At least {required} unbatched students are required to start auto-batching. Currently, there are only {available}.")]
    InsufficientPool { available: usize, required: usize },
    #[error("unknown class: {0}")]
    UnknownClass(String),
    #[error("unknown batch: {0}")]
    UnknownBatch(String),
    #[error("unknown mentor: {0}")]
    UnknownMentor(String),
    #[error("unknown mentee: {0}")]
    UnknownMentee(String),
    #[error("unknown assignment: {0}")]
    UnknownAssignment(String),
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("unknown leave request: {0}")]
    UnknownLeaveRequest(String),
    #[error("unknown import: {0}")]
    UnknownImport(String),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
    #[error("You have already submitted a request for this session.")]
    DuplicateLeave,
    #[error("persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl SchedError {
    pub(crate) fn validation<S: Into<String>>(msg: S) -> Self {
        SchedError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedError::Validation(_) | SchedError::InvalidTransition { .. } => {
                ErrorKind::Validation
            }
            SchedError::Collision(_) => ErrorKind::Conflict,
            SchedError::Capacity { .. } => ErrorKind::Capacity,
            SchedError::DuplicateAssignment(_) | SchedError::DuplicateLeave => {
                ErrorKind::Duplicate
            }
            SchedError::InsufficientPool { .. } => ErrorKind::InsufficientPool,
            SchedError::UnknownClass(_)
            | SchedError::UnknownBatch(_)
            | SchedError::UnknownMentor(_)
            | SchedError::UnknownMentee(_)
            | SchedError::UnknownAssignment(_)
            | SchedError::UnknownSession(_)
            | SchedError::UnknownLeaveRequest(_)
            | SchedError::UnknownImport(_) => ErrorKind::NotFound,
            SchedError::Forbidden(_) => ErrorKind::Forbidden,
            SchedError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Forme de réponse attendue par la couche requêtes.
    pub fn to_response(&self) -> serde_json::Value {
        match self {
            SchedError::Collision(_) => json!({ "conflict": true, "message": self.to_string() }),
            _ => json!({ "error": self.kind().as_str(), "message": self.to_string() }),
        }
    }
}
