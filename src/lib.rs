#![forbid(unsafe_code)]
//! Mentorat : moteur de planification d'un programme de mentorat (sans BD).
//!
//! - Calendriers hebdomadaires (congés du 3e samedi exclus).
//! - Détection de collisions et plafond de charge par mentor.
//! - Découpage automatique des classes en batches.
//! - Chaque opération est tout-ou-rien ; stockage fichier JSON atomique.
//! - Instants stockés en UTC ; saisie et affichage dans le fuseau institutionnel.

pub mod io;
pub mod model;
pub mod notification;
pub mod policy;
pub mod scheduler;
pub mod storage;

pub use model::{
    Absence, AssignmentId, Batch, BatchId, Class, ClassId, ImportId, LeaveRequest, LeaveRequestId,
    LeaveStatus, Mentee, MenteeId, MenteeRow, Mentor, MentorAssignment, MentorId, PendingImport,
    Registry, Session, SessionId, SessionStatus,
};
pub use notification::{Notification, NoticeRenderer, Recipient, TextNotice};
pub use policy::Policy;
pub use scheduler::{
    partition, partition_with, AttendanceMark, AttendanceStatus, Conflict, ErrorKind,
    LeaveDecision, RecurrenceSpec, SchedError, Scheduler, SweepReport, UpdateAction,
};
pub use storage::{JsonStorage, Storage};
