//! Opt-out list queries. TCPA requires STOP requests to stick.

use crate::error::AppError;
use sqlx::PgPool;

#[derive(Debug, Default, Clone, Copy)]
pub struct OptOutRepository;

impl OptOutRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn add(&self, db: &PgPool, phone: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO opt_outs (phone) VALUES ($1) ON CONFLICT (phone) DO NOTHING")
            .bind(phone)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn is_opted_out(&self, db: &PgPool, phone: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM opt_outs WHERE phone = $1)")
                .bind(phone)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    pub async fn find_all(&self, db: &PgPool) -> Result<Vec<String>, AppError> {
        let phones =
            sqlx::query_scalar::<_, String>("SELECT phone FROM opt_outs ORDER BY id ASC")
                .fetch_all(db)
                .await?;
        Ok(phones)
    }
}
