use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::volunteer::VolunteerSummary;

/// How unowned work reaches volunteers: split evenly at join time, or pulled
/// one at a time from the shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    AutoSplit,
    Claim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub name: String,
    pub message_template: String,
    pub assignment_mode: AssignmentMode,
    pub join_code: String,
    pub status: SessionStatus,
    pub code_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSessionPayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub message_template: String,
    #[serde(default)]
    pub assignment_mode: Option<AssignmentMode>,
    #[validate(length(min = 1))]
    pub contact_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSessionPayload {
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub assignment_mode: Option<AssignmentMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub id: i64,
    pub join_code: String,
}

/// Session row plus the aggregate counters the dashboard list shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    pub total_contacts: i64,
    pub sent: i64,
    pub volunteer_count: i64,
    pub online_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub volunteers: Vec<VolunteerSummary>,
    pub total_contacts: i64,
    pub total_sent: i64,
    pub total_replies: i64,
    pub remaining: i64,
}
