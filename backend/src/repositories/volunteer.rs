//! Volunteer registry queries.

use crate::error::AppError;
use crate::models::volunteer::Volunteer;
use sqlx::{PgConnection, PgPool};

const TABLE_NAME: &str = "p2p_volunteers";
const SELECT_COLUMNS: &str = "id, session_id, name, is_online, joined_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct VolunteerRepository;

impl VolunteerRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(&self, db: &PgPool, id: i64) -> Result<Option<Volunteer>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let row = sqlx::query_as::<_, Volunteer>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub async fn find_by_session_and_name(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        name: &str,
    ) -> Result<Option<Volunteer>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE session_id = $1 AND name = $2",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, Volunteer>(&query)
            .bind(session_id)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        name: &str,
    ) -> Result<Volunteer, AppError> {
        let query = format!(
            "INSERT INTO {} (session_id, name) VALUES ($1, $2) RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Volunteer>(&query)
            .bind(session_id)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn set_online(
        &self,
        conn: &mut PgConnection,
        id: i64,
        is_online: bool,
    ) -> Result<(), AppError> {
        let query = format!("UPDATE {} SET is_online = $2 WHERE id = $1", TABLE_NAME);
        sqlx::query(&query)
            .bind(id)
            .bind(is_online)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn find_all_by_session(
        &self,
        db: &PgPool,
        session_id: i64,
    ) -> Result<Vec<Volunteer>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE session_id = $1 ORDER BY id ASC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Volunteer>(&query)
            .bind(session_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Online volunteers in join order, optionally excluding one (the
    /// volunteer whose work is being redistributed).
    pub async fn online_volunteers(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        exclude: Option<i64>,
    ) -> Result<Vec<Volunteer>, AppError> {
        let query = format!(
            "SELECT {} FROM {} \
             WHERE session_id = $1 AND is_online AND ($2::BIGINT IS NULL OR id <> $2) \
             ORDER BY id ASC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Volunteer>(&query)
            .bind(session_id)
            .bind(exclude)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    pub async fn online_count(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
    ) -> Result<i64, AppError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE session_id = $1 AND is_online",
            TABLE_NAME
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(session_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// The online volunteer with the fewest in-flight assignments. Ties break
    /// toward the earliest joiner so the choice is deterministic.
    pub async fn least_loaded_online(
        &self,
        conn: &mut PgConnection,
        session_id: i64,
        exclude: i64,
    ) -> Result<Option<Volunteer>, AppError> {
        let query = format!(
            "SELECT {} FROM {table} v \
             LEFT JOIN p2p_assignments a ON a.volunteer_id = v.id \
                 AND a.status IN ('pending', 'sent', 'in_conversation') \
             WHERE v.session_id = $1 AND v.is_online AND v.id <> $2 \
             GROUP BY v.id \
             ORDER BY COUNT(a.id) ASC, v.id ASC \
             LIMIT 1",
            SELECT_COLUMNS
                .split(", ")
                .map(|col| format!("v.{}", col))
                .collect::<Vec<_>>()
                .join(", "),
            table = TABLE_NAME
        );
        let row = sqlx::query_as::<_, Volunteer>(&query)
            .bind(session_id)
            .bind(exclude)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }
}
