//! Message log queries.

use crate::error::AppError;
use crate::models::message::{Message, MessageDirection};
use sqlx::{PgConnection, PgPool};

const TABLE_NAME: &str = "messages";
const SELECT_COLUMNS: &str = "id, phone, body, direction, session_id, volunteer_name, created_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct MessageRepository;

impl MessageRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        phone: &str,
        body: &str,
        direction: MessageDirection,
        session_id: Option<i64>,
        volunteer_name: Option<&str>,
    ) -> Result<(), AppError> {
        let query = format!(
            "INSERT INTO {} (phone, body, direction, session_id, volunteer_name) \
             VALUES ($1, $2, $3, $4, $5)",
            TABLE_NAME
        );
        sqlx::query(&query)
            .bind(phone)
            .bind(body)
            .bind(direction)
            .bind(session_id)
            .bind(volunteer_name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn find_all(&self, db: &PgPool) -> Result<Vec<Message>, AppError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY id DESC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Message>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    /// Full thread between the campaign and one phone number within a session.
    pub async fn conversation(
        &self,
        db: &PgPool,
        phone: &str,
        session_id: i64,
    ) -> Result<Vec<Message>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE phone = $1 AND session_id = $2 ORDER BY id ASC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Message>(&query)
            .bind(phone)
            .bind(session_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }
}
