use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Lifecycle of one contact inside one texting session.
///
/// `pending -> sent -> in_conversation -> completed`, with `skipped` reachable
/// from `pending` or `sent`. `completed` and `skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Sent,
    InConversation,
    Completed,
    Skipped,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Sent => "sent",
            AssignmentStatus::InConversation => "in_conversation",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Skipped)
    }
}

impl FromStr for AssignmentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssignmentStatus::Pending),
            "sent" => Ok(AssignmentStatus::Sent),
            "in_conversation" => Ok(AssignmentStatus::InConversation),
            "completed" => Ok(AssignmentStatus::Completed),
            "skipped" => Ok(AssignmentStatus::Skipped),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: i64,
    pub session_id: i64,
    pub volunteer_id: Option<i64>,
    pub contact_id: i64,
    pub status: AssignmentStatus,
    /// First owner a conversation was moved away from; cleared on snap-back.
    pub original_volunteer_id: Option<i64>,
    pub assigned_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Assignment joined with the contact fields a volunteer needs to text.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AssignmentWithContact {
    pub id: i64,
    pub session_id: i64,
    pub volunteer_id: Option<i64>,
    pub contact_id: i64,
    pub status: AssignmentStatus,
    pub original_volunteer_id: Option<i64>,
    pub assigned_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AssignmentStatus::Pending,
            AssignmentStatus::Sent,
            AssignmentStatus::InConversation,
            AssignmentStatus::Completed,
            AssignmentStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse(), Ok(status));
        }
        assert!("banana".parse::<AssignmentStatus>().is_err());
    }

    #[test]
    fn only_completed_and_skipped_are_terminal() {
        assert!(AssignmentStatus::Completed.is_terminal());
        assert!(AssignmentStatus::Skipped.is_terminal());
        assert!(!AssignmentStatus::Pending.is_terminal());
        assert!(!AssignmentStatus::Sent.is_terminal());
        assert!(!AssignmentStatus::InConversation.is_terminal());
    }
}
