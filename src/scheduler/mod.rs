mod admin;
mod assignment;
mod batching;
pub mod calendar;
mod capacity;
mod conflicts;
mod leave;
mod lifecycle;
mod mutate;
mod types;
mod util;

pub use batching::{partition, partition_with};
pub use calendar::{generate_occurrences, is_third_saturday, RecurrenceSpec};
pub use types::{
    AttendanceMark, AttendanceStatus, Conflict, ErrorKind, LeaveDecision, SchedError, SweepReport,
    UpdateAction,
};

use crate::model::{
    AssignmentId, BatchId, ClassId, ImportId, LeaveRequestId, LeaveStatus, Mentee, MenteeId,
    MenteeRow, Mentor, MentorId, Registry, SessionId,
};
use crate::notification::{NoticeRenderer, TextNotice};
use crate::policy::Policy;
use crate::storage::Storage;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Contexte en lecture seule passé aux opérations.
pub struct Env<'a> {
    pub policy: &'a Policy,
    pub zone: Tz,
    pub renderer: &'a dyn NoticeRenderer,
}

/// Scheduler : encapsule le Registry et applique chaque opération comme
/// une unité de travail tout-ou-rien.
#[derive(Debug)]
pub struct Scheduler {
    registry: Registry,
    policy: Policy,
    zone: Tz,
    renderer: Box<dyn NoticeRenderer>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            registry: Registry::default(),
            policy: Policy::default(),
            zone: chrono_tz::Asia::Kolkata,
            renderer: Box::new(TextNotice),
        }
    }

    pub fn with_policy(policy: Policy) -> anyhow::Result<Self> {
        policy.validate()?;
        let zone = policy.zone()?;
        Ok(Self {
            registry: Registry::default(),
            policy,
            zone,
            renderer: Box::new(TextNotice),
        })
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn NoticeRenderer>) {
        self.renderer = renderer;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Exécute `op` sur une copie du registre ; la copie remplace l'état
    /// courant uniquement si `op` réussit.
    pub fn transaction<T, F>(&mut self, op: F) -> Result<T, SchedError>
    where
        F: FnOnce(&mut Registry, &Env<'_>) -> Result<T, SchedError>,
    {
        let mut draft = self.registry.clone();
        let env = Env {
            policy: &self.policy,
            zone: self.zone,
            renderer: self.renderer.as_ref(),
        };
        let out = op(&mut draft, &env).inspect_err(|err| {
            warn!(kind = err.kind().as_str(), error = %err, "operation rejected, nothing written");
        })?;
        self.registry = draft;
        Ok(out)
    }

    /// Sauvegarde l'état validé.
    pub fn persist(&self, storage: &dyn Storage) -> Result<(), SchedError> {
        storage.save(&self.registry).map_err(SchedError::Persistence)
    }

    // ---- administration ----

    pub fn add_class(&mut self, name: &str) -> Result<ClassId, SchedError> {
        self.transaction(|r, _| admin::add_class(r, name))
    }

    pub fn archive_class(&mut self, id: &ClassId) -> Result<(), SchedError> {
        self.transaction(|r, _| admin::archive_class(r, id))
    }

    pub fn delete_class(&mut self, id: &ClassId) -> Result<(), SchedError> {
        self.transaction(|r, _| admin::delete_class(r, id))
    }

    pub fn add_mentor(&mut self, mentor: Mentor) -> Result<MentorId, SchedError> {
        self.transaction(|r, _| admin::add_mentor(r, mentor))
    }

    pub fn delete_mentor(&mut self, id: &MentorId) -> Result<(), SchedError> {
        self.transaction(|r, _| admin::delete_mentor(r, id))
    }

    pub fn add_mentee(&mut self, mentee: Mentee) -> Result<MenteeId, SchedError> {
        self.transaction(|r, _| admin::add_mentee(r, mentee))
    }

    pub fn stage_import(
        &mut self,
        class: &ClassId,
        rows: Vec<MenteeRow>,
        now: DateTime<Utc>,
    ) -> Result<ImportId, SchedError> {
        self.transaction(|r, env| admin::stage_import(r, env, class, rows, now))
    }

    /// Confirme un import préparé ; un import expiré est rejeté puis retiré.
    pub fn confirm_import(&mut self, id: &ImportId, now: DateTime<Utc>) -> Result<Vec<MenteeId>, SchedError> {
        let out = self.transaction(|r, _| admin::confirm_import(r, id, now));
        if out.is_err() {
            self.registry
                .pending_imports
                .retain(|p| !(&p.id == id && p.expires_at <= now));
        }
        out
    }

    pub fn discard_import(&mut self, id: &ImportId) -> Result<(), SchedError> {
        self.transaction(|r, _| admin::discard_import(r, id))
    }

    // ---- batches ----

    /// Découpe automatique des étudiants sans batch ; renvoie les batches créés.
    pub fn auto_batch(&mut self, class: &ClassId) -> Result<Vec<BatchId>, SchedError> {
        self.transaction(|r, env| batching::auto_batch(r, class, env.policy))
    }

    pub fn manual_batch(&mut self, batch: &BatchId, students: &[MenteeId]) -> Result<usize, SchedError> {
        self.transaction(|r, env| batching::manual_batch(r, batch, students, env.policy))
    }

    // ---- contrôles en lecture ----

    pub fn find_collision(
        &self,
        mentor: &MentorId,
        candidates: &[DateTime<Utc>],
        exclude: Option<&AssignmentId>,
    ) -> Option<Conflict> {
        conflicts::find_collision(&self.registry, mentor, candidates, exclude)
    }

    pub fn check_capacity(&self, mentor: &MentorId, batch: &BatchId) -> Result<(), SchedError> {
        capacity::check_capacity(&self.registry, mentor, batch, self.policy.mentee_ceiling)
    }

    // ---- affectations ----

    pub fn create_assignment(
        &mut self,
        mentor: &MentorId,
        batch: &BatchId,
        recurrence: &RecurrenceSpec,
    ) -> Result<AssignmentId, SchedError> {
        self.transaction(|r, env| assignment::create_assignment(r, env, mentor, batch, recurrence))
    }

    /// Renvoie l'affectation en vigueur après l'opération (`None` après un retrait).
    pub fn update_assignment(
        &mut self,
        id: &AssignmentId,
        action: UpdateAction,
        now: DateTime<Utc>,
    ) -> Result<Option<AssignmentId>, SchedError> {
        self.transaction(|r, env| mutate::update_assignment(r, env, id, action, now))
    }

    pub fn unassign(&mut self, id: &AssignmentId, now: DateTime<Utc>) -> Result<(), SchedError> {
        self.transaction(|r, _| mutate::unassign(r, id, now))
    }

    pub fn reschedule(
        &mut self,
        id: &AssignmentId,
        recurrence: &RecurrenceSpec,
        now: DateTime<Utc>,
    ) -> Result<(), SchedError> {
        self.transaction(|r, env| mutate::reschedule(r, env, id, recurrence, now))
    }

    pub fn reassign(
        &mut self,
        id: &AssignmentId,
        mentor: &MentorId,
        recurrence: &RecurrenceSpec,
        now: DateTime<Utc>,
    ) -> Result<AssignmentId, SchedError> {
        self.transaction(|r, env| mutate::reassign(r, env, id, mentor, recurrence, now))
    }

    pub fn assign_substitute(
        &mut self,
        id: &AssignmentId,
        substitute: &MentorId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(), SchedError> {
        self.transaction(|r, env| mutate::assign_substitute(r, env, id, substitute, from, to))
    }

    pub fn end_substitution(&mut self, id: &AssignmentId) -> Result<(), SchedError> {
        self.transaction(|r, _| mutate::end_substitution(r, id))
    }

    // ---- séances ----

    pub fn start_session(
        &mut self,
        id: &SessionId,
        mentor: &MentorId,
        now: DateTime<Utc>,
    ) -> Result<(), SchedError> {
        self.transaction(|r, env| lifecycle::start_session(r, id, mentor, now, env.policy.live_window()))
    }

    pub fn end_session(
        &mut self,
        id: &SessionId,
        mentor: &MentorId,
        now: DateTime<Utc>,
    ) -> Result<(), SchedError> {
        self.transaction(|r, _| lifecycle::end_session(r, id, mentor, now))
    }

    /// Balayage des séances manquées (tâche périodique hors requêtes).
    pub fn sweep_missed(&mut self, now: DateTime<Utc>) -> SweepReport {
        let grace = self.policy.missed_grace();
        lifecycle::sweep_missed(&mut self.registry, now, grace)
    }

    // ---- congés et présence ----

    pub fn request_leave(
        &mut self,
        session: &SessionId,
        mentee: &MenteeId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequestId, SchedError> {
        self.transaction(|r, env| leave::request_leave(r, env, session, mentee, reason, now))
    }

    pub fn action_leave(
        &mut self,
        request: &LeaveRequestId,
        mentor: &MentorId,
        decision: LeaveDecision,
        now: DateTime<Utc>,
    ) -> Result<LeaveStatus, SchedError> {
        self.transaction(|r, env| leave::action_leave(r, env, request, mentor, decision, now))
    }

    pub fn mark_attendance(
        &mut self,
        session: &SessionId,
        mentor: &MentorId,
        mentee: &MenteeId,
        mark: AttendanceMark,
    ) -> Result<(), SchedError> {
        self.transaction(|r, _| leave::mark_attendance(r, session, mentor, mentee, mark))
    }

    pub fn attendance_status(&self, session: &SessionId, mentee: &MenteeId) -> AttendanceStatus {
        leave::attendance_status(&self.registry, session, mentee)
    }
}
