//! Contact list queries.

use crate::error::AppError;
use crate::models::contact::{Contact, CreateContactPayload};
use sqlx::{PgConnection, PgPool};

const TABLE_NAME: &str = "contacts";
const SELECT_COLUMNS: &str = "id, phone, first_name, last_name, city, created_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct ContactRepository;

impl ContactRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_all(&self, db: &PgPool) -> Result<Vec<Contact>, AppError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY id DESC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Contact>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    pub async fn create(&self, db: &PgPool, payload: &CreateContactPayload) -> Result<i64, AppError> {
        let query = format!(
            "INSERT INTO {} (phone, first_name, last_name, city) \
             VALUES ($1, $2, $3, $4) RETURNING id",
            TABLE_NAME
        );
        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(&payload.phone)
            .bind(payload.first_name.as_deref().unwrap_or(""))
            .bind(payload.last_name.as_deref().unwrap_or(""))
            .bind(payload.city.as_deref().unwrap_or(""))
            .fetch_one(db)
            .await?;
        Ok(id)
    }

    /// Bulk import; rows without a phone number are skipped. Runs on a
    /// transaction connection so a failed import adds nothing.
    pub async fn create_many(
        &self,
        conn: &mut PgConnection,
        contacts: &[CreateContactPayload],
    ) -> Result<u64, AppError> {
        let query = format!(
            "INSERT INTO {} (phone, first_name, last_name, city) VALUES ($1, $2, $3, $4)",
            TABLE_NAME
        );
        let mut added = 0;
        for contact in contacts {
            if contact.phone.is_empty() {
                continue;
            }
            sqlx::query(&query)
                .bind(&contact.phone)
                .bind(contact.first_name.as_deref().unwrap_or(""))
                .bind(contact.last_name.as_deref().unwrap_or(""))
                .bind(contact.city.as_deref().unwrap_or(""))
                .execute(&mut *conn)
                .await?;
            added += 1;
        }
        Ok(added)
    }

    pub async fn delete(&self, db: &PgPool, id: i64) -> Result<u64, AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        let result = sqlx::query(&query).bind(id).execute(db).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self, db: &PgPool) -> Result<u64, AppError> {
        let query = format!("DELETE FROM {}", TABLE_NAME);
        let result = sqlx::query(&query).execute(db).await?;
        Ok(result.rows_affected())
    }
}
