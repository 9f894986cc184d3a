use crate::model::{LeaveStatus, MenteeId, MentorId, Registry};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Destinataire d'une notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Mentor(MentorId),
    Mentee(MenteeId),
}

/// Notification stockée (jamais envoyée par la lib).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: Recipient,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: Recipient, message: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient,
            message,
            is_read: false,
            timestamp,
        }
    }
}

/// Permet de customiser le texte des notifications (langue, ton, etc.).
pub trait NoticeRenderer: fmt::Debug {
    fn leave_requested(&self, mentee_name: &str, session_start: &DateTime<Tz>) -> String;
    fn leave_actioned(&self, status: LeaveStatus, session_start: &DateTime<Tz>) -> String;
}

/// Gabarit texte simple, dates au format `15-Jan-2025`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextNotice;

impl NoticeRenderer for TextNotice {
    fn leave_requested(&self, mentee_name: &str, session_start: &DateTime<Tz>) -> String {
        format!(
            "{mentee_name} has requested leave for the session on {}.",
            session_start.format("%d-%b-%Y")
        )
    }

    fn leave_actioned(&self, status: LeaveStatus, session_start: &DateTime<Tz>) -> String {
        let verdict = match status {
            LeaveStatus::Pending => "left pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Declined => "Declined",
        };
        format!(
            "Your leave request for the session on {} has been {verdict}.",
            session_start.format("%d-%b-%Y")
        )
    }
}

/// Notifications non lues d'un destinataire, les plus récentes d'abord.
pub fn unread_for<'a>(registry: &'a Registry, recipient: &Recipient) -> Vec<&'a Notification> {
    let mut out: Vec<&Notification> = registry
        .notifications
        .iter()
        .filter(|n| !n.is_read && &n.recipient == recipient)
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

/// Marque comme lues toutes les notifications du destinataire.
pub fn mark_all_read(registry: &mut Registry, recipient: &Recipient) -> usize {
    let mut count = 0;
    for n in registry
        .notifications
        .iter_mut()
        .filter(|n| !n.is_read && &n.recipient == recipient)
    {
        n.is_read = true;
        count += 1;
    }
    count
}
