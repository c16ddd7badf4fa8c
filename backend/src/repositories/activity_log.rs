//! Activity feed shown on the dashboard.

use crate::error::AppError;
use sqlx::PgConnection;

#[derive(Debug, Default, Clone, Copy)]
pub struct ActivityLogRepository;

impl ActivityLogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn log(&self, conn: &mut PgConnection, message: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO activity_log (message) VALUES ($1)")
            .bind(message)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
