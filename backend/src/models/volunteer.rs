use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Volunteer {
    pub id: i64,
    pub session_id: i64,
    pub name: String,
    pub is_online: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinSessionPayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionResponse {
    pub success: bool,
    pub volunteer_id: i64,
    pub session_id: i64,
    pub session_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolunteerStatusPayload {
    pub is_online: bool,
}

/// Volunteer row plus the per-volunteer counters shown on the session detail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerSummary {
    #[serde(flatten)]
    pub volunteer: Volunteer,
    pub sent: i64,
    pub active_chats: i64,
    pub remaining: i64,
}
