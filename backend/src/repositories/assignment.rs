//! Assignment store.
//!
//! Owns every query that reads or mutates `p2p_assignments`. Compound
//! operations (batch creation, redistribution, snap-back) take a transaction
//! connection; single-row guarded transitions enforce the assignment state
//! machine at the SQL level via status predicates.

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentWithContact};
use sqlx::{PgConnection, PgPool};

const TABLE_NAME: &str = "p2p_assignments";
const SELECT_COLUMNS: &str = "id, session_id, volunteer_id, contact_id, status, \
     original_volunteer_id, assigned_at, sent_at, completed_at";
const CONTACT_JOIN_COLUMNS: &str = "a.id, a.session_id, a.volunteer_id, a.contact_id, a.status, \
     a.original_volunteer_id, a.assigned_at, a.sent_at, a.completed_at, \
     c.phone, c.first_name, c.last_name, c.city";

#[derive(Debug, Default, Clone, Copy)]
pub struct AssignmentRepository;

impl AssignmentRepository {
    pub fn new() -> Self {
        Self
    }

    /// Enqueue one pending assignment per contact id, as a single statement.
    pub async fn create_batch(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        contact_ids: &[i64],
    ) -> Result<u64, AppError> {
        let query = format!(
            "INSERT INTO {} (session_id, contact_id) \
             SELECT $1, contact_id FROM UNNEST($2::BIGINT[]) AS t(contact_id)",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(session_id)
            .bind(contact_ids)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(&self, db: &PgPool, id: i64) -> Result<Option<Assignment>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let row = sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub async fn find_with_contact(
        &self,
        db: &PgPool,
        id: i64,
    ) -> Result<Option<AssignmentWithContact>, AppError> {
        let query = format!(
            "SELECT {} FROM {} a JOIN contacts c ON c.id = a.contact_id WHERE a.id = $1",
            CONTACT_JOIN_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, AssignmentWithContact>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Next text the volunteer should send, oldest first.
    pub async fn next_pending_with_contact(
        &self,
        db: &PgPool,
        volunteer_id: i64,
    ) -> Result<Option<AssignmentWithContact>, AppError> {
        let query = format!(
            "SELECT {} FROM {} a JOIN contacts c ON c.id = a.contact_id \
             WHERE a.volunteer_id = $1 AND a.status = 'pending' \
             ORDER BY a.id ASC LIMIT 1",
            CONTACT_JOIN_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, AssignmentWithContact>(&query)
            .bind(volunteer_id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub async fn active_conversations_with_contact(
        &self,
        db: &PgPool,
        volunteer_id: i64,
    ) -> Result<Vec<AssignmentWithContact>, AppError> {
        let query = format!(
            "SELECT {} FROM {} a JOIN contacts c ON c.id = a.contact_id \
             WHERE a.volunteer_id = $1 AND a.status = 'in_conversation' \
             ORDER BY a.id ASC",
            CONTACT_JOIN_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, AssignmentWithContact>(&query)
            .bind(volunteer_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    pub async fn pending_ids(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
    ) -> Result<Vec<i64>, AppError> {
        let query = format!(
            "SELECT id FROM {} \
             WHERE session_id = $1 AND volunteer_id = $2 AND status = 'pending' \
             ORDER BY id ASC",
            TABLE_NAME
        );
        let ids = sqlx::query_scalar::<_, i64>(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids)
    }

    pub async fn conversation_ids(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
    ) -> Result<Vec<i64>, AppError> {
        let query = format!(
            "SELECT id FROM {} \
             WHERE session_id = $1 AND volunteer_id = $2 \
               AND status IN ('sent', 'in_conversation') \
             ORDER BY id ASC",
            TABLE_NAME
        );
        let ids = sqlx::query_scalar::<_, i64>(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids)
    }

    /// Hand one assignment to a new owner, remembering the first owner it was
    /// taken from. COALESCE keeps the provenance marker single-hop.
    pub async fn reassign(
        &self,
        conn: &mut PgConnection,
        assignment_id: i64,
        new_volunteer_id: i64,
        departing_volunteer_id: i64,
    ) -> Result<(), AppError> {
        let query = format!(
            "UPDATE {} SET volunteer_id = $2, \
             original_volunteer_id = COALESCE(original_volunteer_id, $3) \
             WHERE id = $1",
            TABLE_NAME
        );
        sqlx::query(&query)
            .bind(assignment_id)
            .bind(new_volunteer_id)
            .bind(departing_volunteer_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Return every conversation that was moved away from this volunteer.
    pub async fn snap_back_conversations(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
    ) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET volunteer_id = $2 \
             WHERE original_volunteer_id = $2 AND session_id = $1 \
               AND status IN ('sent', 'in_conversation')",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop the provenance marker on everything the volunteer now owns.
    pub async fn clear_provenance(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
    ) -> Result<(), AppError> {
        let query = format!(
            "UPDATE {} SET original_volunteer_id = NULL \
             WHERE volunteer_id = $2 AND session_id = $1",
            TABLE_NAME
        );
        sqlx::query(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Give a volunteer up to `limit` unowned pending assignments.
    pub async fn assign_unowned_batch(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
        limit: i64,
    ) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {table} SET volunteer_id = $2 \
             WHERE id IN (SELECT id FROM {table} \
                          WHERE session_id = $1 AND volunteer_id IS NULL \
                            AND status = 'pending' \
                          ORDER BY id ASC LIMIT $3)",
            table = TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .bind(limit)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Claim-mode pull: take exactly one unowned pending assignment.
    pub async fn claim_next(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        volunteer_id: i64,
    ) -> Result<Option<i64>, AppError> {
        let query = format!(
            "UPDATE {table} SET volunteer_id = $2 \
             WHERE id = (SELECT id FROM {table} \
                         WHERE session_id = $1 AND volunteer_id IS NULL \
                           AND status = 'pending' \
                         ORDER BY id ASC LIMIT 1) \
             RETURNING id",
            table = TABLE_NAME
        );
        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(session_id)
            .bind(volunteer_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(id)
    }

    pub async fn count_unowned_pending(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
    ) -> Result<i64, AppError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} \
             WHERE session_id = $1 AND volunteer_id IS NULL AND status = 'pending'",
            TABLE_NAME
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(session_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// Mark dispatched. Guarded so a terminal or conversational assignment
    /// cannot be pulled back to `sent`.
    pub async fn mark_sent(&self, conn: &mut PgConnection, id: i64) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'sent', sent_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'sent')",
            TABLE_NAME
        );
        let result = sqlx::query(&query).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    /// An inbound reply landed. `in_conversation` never reverts to `sent`.
    pub async fn mark_in_conversation(
        &self,
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'in_conversation' \
             WHERE id = $1 AND status IN ('sent', 'in_conversation')",
            TABLE_NAME
        );
        let result = sqlx::query(&query).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn complete(&self, db: &PgPool, id: i64) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'completed', completed_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'sent', 'in_conversation')",
            TABLE_NAME
        );
        let result = sqlx::query(&query).bind(id).execute(db).await?;
        Ok(result.rows_affected())
    }

    pub async fn skip(&self, db: &PgPool, id: i64) -> Result<u64, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'skipped' \
             WHERE id = $1 AND status IN ('pending', 'sent')",
            TABLE_NAME
        );
        let result = sqlx::query(&query).bind(id).execute(db).await?;
        Ok(result.rows_affected())
    }

    /// Most recently texted live assignment for a phone number in any active
    /// session. This is how inbound replies find their conversation.
    pub async fn match_inbound(
        &self,
        conn: &mut PgConnection,
        phone: &str,
    ) -> Result<Option<Assignment>, AppError> {
        let query = format!(
            "SELECT {} FROM {} a \
             JOIN contacts c ON c.id = a.contact_id \
             JOIN p2p_sessions s ON s.id = a.session_id \
             WHERE c.phone = $1 AND s.status = 'active' \
               AND a.status IN ('sent', 'in_conversation') \
             ORDER BY a.sent_at DESC NULLS LAST, a.id DESC \
             LIMIT 1",
            SELECT_COLUMNS
                .split(", ")
                .map(|col| format!("a.{}", col))
                .collect::<Vec<_>>()
                .join(", "),
            TABLE_NAME
        );
        let row = sqlx::query_as::<_, Assignment>(&query)
            .bind(phone)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn count_for_volunteer(&self, db: &PgPool, volunteer_id: i64) -> Result<i64, AppError> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE volunteer_id = $1", TABLE_NAME);
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .bind(volunteer_id)
            .fetch_one(db)
            .await?)
    }

    pub async fn count_sent_for_volunteer(
        &self,
        db: &PgPool,
        volunteer_id: i64,
    ) -> Result<i64, AppError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE volunteer_id = $1 \
             AND status IN ('sent', 'in_conversation', 'completed')",
            TABLE_NAME
        );
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .bind(volunteer_id)
            .fetch_one(db)
            .await?)
    }

    pub async fn count_in_conversation_for_volunteer(
        &self,
        db: &PgPool,
        volunteer_id: i64,
    ) -> Result<i64, AppError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE volunteer_id = $1 AND status = 'in_conversation'",
            TABLE_NAME
        );
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .bind(volunteer_id)
            .fetch_one(db)
            .await?)
    }

    pub async fn count_pending_for_volunteer(
        &self,
        db: &PgPool,
        volunteer_id: i64,
    ) -> Result<i64, AppError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE volunteer_id = $1 AND status = 'pending'",
            TABLE_NAME
        );
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .bind(volunteer_id)
            .fetch_one(db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_columns_cover_state_machine_fields() {
        assert!(SELECT_COLUMNS.contains("status"));
        assert!(SELECT_COLUMNS.contains("original_volunteer_id"));
        assert!(SELECT_COLUMNS.contains("sent_at"));
        assert!(SELECT_COLUMNS.contains("completed_at"));
    }
}
