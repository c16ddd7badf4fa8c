//! Texting session queries and the aggregate counters the dashboard reads.

use crate::error::AppError;
use crate::models::session::{AssignmentMode, Session, SessionStatus};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

const TABLE_NAME: &str = "p2p_sessions";
const SELECT_COLUMNS: &str =
    "id, name, message_template, assignment_mode, join_code, status, code_expires_at, created_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct SessionRepository;

impl SessionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        name: &str,
        message_template: &str,
        assignment_mode: AssignmentMode,
        join_code: &str,
        code_expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let query = format!(
            "INSERT INTO {} (name, message_template, assignment_mode, join_code, code_expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Session>(&query)
            .bind(name)
            .bind(message_template)
            .bind(assignment_mode)
            .bind(join_code)
            .bind(code_expires_at)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, db: &PgPool, id: i64) -> Result<Option<Session>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let row = sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Resolve a join code to its active session. Codes are not enforced
    /// unique, so a collision resolves to the newest session.
    pub async fn find_active_by_code(
        &self,
        db: &PgPool,
        code: &str,
    ) -> Result<Option<Session>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE join_code = $1 AND status = 'active' \
             ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, Session>(&query)
            .bind(code)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub async fn find_all(&self, db: &PgPool) -> Result<Vec<Session>, AppError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY id DESC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Session>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    pub async fn update(
        &self,
        db: &PgPool,
        id: i64,
        status: Option<SessionStatus>,
        assignment_mode: Option<AssignmentMode>,
    ) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET status = COALESCE($2, status), \
             assignment_mode = COALESCE($3, assignment_mode) WHERE id = $1",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(status)
            .bind(assignment_mode)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i64) -> Result<u64, AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        let result = sqlx::query(&query).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn total_contacts(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM p2p_assignments WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn total_sent(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM p2p_assignments WHERE session_id = $1 \
             AND status IN ('sent', 'in_conversation', 'completed')",
        )
        .bind(session_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn total_replies(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM p2p_assignments WHERE session_id = $1 \
             AND status = 'in_conversation'",
        )
        .bind(session_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn remaining(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM p2p_assignments WHERE session_id = $1 AND status = 'pending'",
        )
        .bind(session_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn volunteer_count(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM p2p_volunteers WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn online_count(&self, db: &PgPool, session_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM p2p_volunteers WHERE session_id = $1 AND is_online",
        )
        .bind(session_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }
}
