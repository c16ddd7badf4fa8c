use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// One SMS in either direction. Messages sent or received inside a P2P session
/// carry its id; everything else is plain inbox traffic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub phone: String,
    pub body: String,
    pub direction: MessageDirection,
    pub session_id: Option<i64>,
    pub volunteer_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
