use crate::notification::Notification;
use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! strong_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

strong_id!(
    /// Identifiant fort pour Class
    ClassId
);
strong_id!(
    /// Identifiant fort pour Batch
    BatchId
);
strong_id!(
    /// Identifiant fort pour Mentee (lié 1:1 à un compte utilisateur)
    MenteeId
);
strong_id!(
    /// Identifiant fort pour Mentor (lié 1:1 à un compte utilisateur)
    MentorId
);
strong_id!(AssignmentId);
strong_id!(SessionId);
strong_id!(LeaveRequestId);
strong_id!(ImportId);

/// Cohorte d'étudiants (année / programme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
}

impl Class {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: ClassId::random(),
            name: name.into(),
            is_archived: false,
        }
    }
}

/// Sous-groupe d'une classe, confié comme un tout à un mentor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub class: ClassId,
}

impl Batch {
    pub fn new<N: Into<String>>(name: N, class: ClassId) -> Self {
        Self {
            id: BatchId::random(),
            name: name.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentee {
    pub id: MenteeId,
    /// Numéro d'inscription : clé de tri stable pour le découpage en batches.
    pub reg_num: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub class: ClassId,
    /// `None` tant que l'étudiant n'est pas placé dans un batch.
    #[serde(default)]
    pub batch: Option<BatchId>,
}

impl Mentee {
    pub fn new<R: Into<String>, N: Into<String>>(reg_num: R, name: N, class: ClassId) -> Self {
        Self {
            id: MenteeId::random(),
            reg_num: reg_num.into(),
            name: name.into(),
            email: None,
            class,
            batch: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    pub id: MentorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl Mentor {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: MentorId::random(),
            name: name.into(),
            email: None,
            department: None,
        }
    }
}

/// Lien mentor ↔ batch, propriétaire de ses séances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorAssignment {
    pub id: AssignmentId,
    pub mentor: MentorId,
    pub batch: BatchId,
    pub is_active: bool,
    /// Remplacement temporaire : le mentor d'origine est mis de côté.
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_mentor: Option<MentorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_end: Option<NaiveDate>,
}

impl MentorAssignment {
    pub fn new(mentor: MentorId, batch: BatchId) -> Self {
        Self {
            id: AssignmentId::random(),
            mentor,
            batch,
            is_active: true,
            is_temporary: false,
            original_mentor: None,
            temp_start: None,
            temp_end: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Upcoming,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Missed,
}

impl SessionStatus {
    /// Transitions autorisées du cycle de vie d'une séance.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Upcoming, SessionStatus::InProgress)
                | (SessionStatus::InProgress, SessionStatus::Completed)
                | (SessionStatus::Upcoming, SessionStatus::Missed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "Upcoming",
            SessionStatus::InProgress => "In Progress",
            SessionStatus::Completed => "Completed",
            SessionStatus::Missed => "Missed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Séance planifiée (instant absolu UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub assignment: AssignmentId,
    pub number: u32,
    pub start_time: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(assignment: AssignmentId, number: u32, start_time: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::random(),
            assignment,
            number,
            start_time,
            status: SessionStatus::Upcoming,
            actual_start: None,
            actual_end: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub session: SessionId,
    pub mentee: MenteeId,
    pub reason: String,
    pub status: LeaveStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actioned_at: Option<DateTime<Utc>>,
}

/// Absence constatée par le mentor (la présence est l'état par défaut).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub session: SessionId,
    pub mentee: MenteeId,
}

/// Ligne d'import d'étudiant, en attente de confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenteeRow {
    pub reg_num: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Import préparé : identifiant + expiration, confirmé explicitement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImport {
    pub id: ImportId,
    pub class: ClassId,
    pub rows: Vec<MenteeRow>,
    pub expires_at: DateTime<Utc>,
}

/// État complet persisté.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub mentees: Vec<Mentee>,
    #[serde(default)]
    pub mentors: Vec<Mentor>,
    #[serde(default)]
    pub assignments: Vec<MentorAssignment>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub leave_requests: Vec<LeaveRequest>,
    #[serde(default)]
    pub absences: Vec<Absence>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub pending_imports: Vec<PendingImport>,
}

impl Registry {
    pub fn find_class(&self, id: &ClassId) -> Option<&Class> {
        self.classes.iter().find(|c| &c.id == id)
    }
    pub fn find_class_mut(&mut self, id: &ClassId) -> Option<&mut Class> {
        self.classes.iter_mut().find(|c| &c.id == id)
    }
    pub fn find_class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }
    pub fn find_batch(&self, id: &BatchId) -> Option<&Batch> {
        self.batches.iter().find(|b| &b.id == id)
    }
    pub fn find_mentee(&self, id: &MenteeId) -> Option<&Mentee> {
        self.mentees.iter().find(|m| &m.id == id)
    }
    pub fn find_mentee_by_reg_num(&self, reg_num: &str) -> Option<&Mentee> {
        self.mentees.iter().find(|m| m.reg_num == reg_num)
    }
    pub fn find_mentor(&self, id: &MentorId) -> Option<&Mentor> {
        self.mentors.iter().find(|m| &m.id == id)
    }
    pub fn find_assignment(&self, id: &AssignmentId) -> Option<&MentorAssignment> {
        self.assignments.iter().find(|a| &a.id == id)
    }
    pub fn find_assignment_mut(&mut self, id: &AssignmentId) -> Option<&mut MentorAssignment> {
        self.assignments.iter_mut().find(|a| &a.id == id)
    }
    pub fn find_session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }
    pub fn find_session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }
    pub fn find_leave(&self, id: &LeaveRequestId) -> Option<&LeaveRequest> {
        self.leave_requests.iter().find(|r| &r.id == id)
    }
    pub fn find_leave_mut(&mut self, id: &LeaveRequestId) -> Option<&mut LeaveRequest> {
        self.leave_requests.iter_mut().find(|r| &r.id == id)
    }

    // ---- requêtes en lecture seule ----

    pub fn mentee_count(&self, batch: &BatchId) -> usize {
        self.mentees
            .iter()
            .filter(|m| m.batch.as_ref() == Some(batch))
            .count()
    }

    /// Charge courante : somme des effectifs des batches sous affectation active.
    pub fn mentor_load(&self, mentor: &MentorId) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.is_active && &a.mentor == mentor)
            .map(|a| self.mentee_count(&a.batch))
            .sum()
    }

    pub fn active_assignment_for_batch(&self, batch: &BatchId) -> Option<&MentorAssignment> {
        self.assignments
            .iter()
            .find(|a| a.is_active && &a.batch == batch)
    }

    pub fn batches_in_class<'a>(&'a self, class: &'a ClassId) -> impl Iterator<Item = &'a Batch> + 'a {
        self.batches.iter().filter(move |b| &b.class == class)
    }

    /// Étudiants sans batch d'une classe, triés par numéro d'inscription.
    pub fn unbatched_mentees(&self, class: &ClassId) -> Vec<&Mentee> {
        let mut out: Vec<&Mentee> = self
            .mentees
            .iter()
            .filter(|m| &m.class == class && m.batch.is_none())
            .collect();
        out.sort_by(|a, b| a.reg_num.cmp(&b.reg_num));
        out
    }

    pub fn sessions_for_assignment(&self, assignment: &AssignmentId) -> Vec<&Session> {
        let mut out: Vec<&Session> = self
            .sessions
            .iter()
            .filter(|s| &s.assignment == assignment)
            .collect();
        out.sort_by_key(|s| (s.start_time, s.number));
        out
    }

    /// Séances de l'affectation strictement postérieures à `after`.
    pub fn sessions_after(&self, assignment: &AssignmentId, after: DateTime<Utc>) -> Vec<&Session> {
        self.sessions_for_assignment(assignment)
            .into_iter()
            .filter(|s| s.start_time > after)
            .collect()
    }

    pub fn upcoming_sessions_for_mentor(&self, mentor: &MentorId, now: DateTime<Utc>) -> Vec<&Session> {
        let mut out: Vec<&Session> = self
            .sessions
            .iter()
            .filter(|s| {
                s.start_time >= now
                    && matches!(s.status, SessionStatus::Upcoming | SessionStatus::InProgress)
                    && self
                        .find_assignment(&s.assignment)
                        .map_or(false, |a| a.is_active && &a.mentor == mentor)
            })
            .collect();
        out.sort_by_key(|s| s.start_time);
        out
    }

    pub fn pending_leave_for_mentor(&self, mentor: &MentorId) -> Vec<&LeaveRequest> {
        let mut out: Vec<&LeaveRequest> = self
            .leave_requests
            .iter()
            .filter(|r| r.status == LeaveStatus::Pending)
            .filter(|r| {
                self.find_session(&r.session)
                    .and_then(|s| self.find_assignment(&s.assignment))
                    .map_or(false, |a| &a.mentor == mentor)
            })
            .collect();
        out.sort_by_key(|r| r.requested_at);
        out
    }

    // ---- écritures contraintes ----

    pub fn insert_class(&mut self, class: Class) -> anyhow::Result<()> {
        if self.find_class_by_name(&class.name).is_some() {
            bail!("class '{}' already exists", class.name);
        }
        self.classes.push(class);
        Ok(())
    }

    pub fn insert_mentee(&mut self, mentee: Mentee) -> anyhow::Result<()> {
        if self.find_mentee_by_reg_num(&mentee.reg_num).is_some() {
            bail!("registration number {} already exists", mentee.reg_num);
        }
        self.mentees.push(mentee);
        Ok(())
    }

    /// Unicité : au plus une affectation active par couple (mentor, batch).
    pub fn insert_assignment(&mut self, assignment: MentorAssignment) -> anyhow::Result<()> {
        if assignment.is_active
            && self.assignments.iter().any(|a| {
                a.is_active && a.mentor == assignment.mentor && a.batch == assignment.batch
            })
        {
            bail!(
                "unique constraint: mentor {} already has an active assignment on batch {}",
                assignment.mentor,
                assignment.batch
            );
        }
        self.assignments.push(assignment);
        Ok(())
    }

    /// Unicité : au plus une demande de congé par couple (séance, étudiant).
    pub fn insert_leave(&mut self, request: LeaveRequest) -> anyhow::Result<()> {
        if self
            .leave_requests
            .iter()
            .any(|r| r.session == request.session && r.mentee == request.mentee)
        {
            bail!(
                "unique constraint: leave request already exists for session {} and mentee {}",
                request.session,
                request.mentee
            );
        }
        self.leave_requests.push(request);
        Ok(())
    }

    /// Supprime les séances de l'affectation postérieures à `now` (cascade congés/absences).
    pub fn delete_future_sessions(&mut self, assignment: &AssignmentId, now: DateTime<Utc>) -> usize {
        let doomed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|s| &s.assignment == assignment && s.start_time > now)
            .map(|s| s.id.clone())
            .collect();
        self.remove_sessions(&doomed);
        doomed.len()
    }

    pub fn remove_assignment(&mut self, id: &AssignmentId) {
        let doomed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|s| &s.assignment == id)
            .map(|s| s.id.clone())
            .collect();
        self.remove_sessions(&doomed);
        self.assignments.retain(|a| &a.id != id);
    }

    /// Cascade : batches → affectations → séances ; les étudiants de la classe sont retirés.
    pub fn remove_class(&mut self, id: &ClassId) {
        let batches: Vec<BatchId> = self.batches_in_class(id).map(|b| b.id.clone()).collect();
        let assignments: Vec<AssignmentId> = self
            .assignments
            .iter()
            .filter(|a| batches.contains(&a.batch))
            .map(|a| a.id.clone())
            .collect();
        for a in &assignments {
            self.remove_assignment(a);
        }
        let gone: Vec<MenteeId> = self
            .mentees
            .iter()
            .filter(|m| &m.class == id)
            .map(|m| m.id.clone())
            .collect();
        self.leave_requests.retain(|r| !gone.contains(&r.mentee));
        self.absences.retain(|r| !gone.contains(&r.mentee));
        self.mentees.retain(|m| &m.class != id);
        self.batches.retain(|b| &b.class != id);
        self.pending_imports.retain(|p| &p.class != id);
        self.classes.retain(|c| &c.id != id);
    }

    /// Cascade : affectations et séances du mentor (l'historique est perdu).
    pub fn remove_mentor(&mut self, id: &MentorId) {
        let assignments: Vec<AssignmentId> = self
            .assignments
            .iter()
            .filter(|a| &a.mentor == id)
            .map(|a| a.id.clone())
            .collect();
        for a in &assignments {
            self.remove_assignment(a);
        }
        for a in self.assignments.iter_mut() {
            if a.original_mentor.as_ref() == Some(id) {
                a.original_mentor = None;
            }
        }
        self.mentors.retain(|m| &m.id != id);
    }

    fn remove_sessions(&mut self, ids: &[SessionId]) {
        if ids.is_empty() {
            return;
        }
        self.sessions.retain(|s| !ids.contains(&s.id));
        self.leave_requests.retain(|r| !ids.contains(&r.session));
        self.absences.retain(|r| !ids.contains(&r.session));
    }
}
