//! Bulk blast bookkeeping.

use crate::error::AppError;
use sqlx::PgPool;

#[derive(Debug, Default, Clone, Copy)]
pub struct CampaignRepository;

impl CampaignRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn record(
        &self,
        db: &PgPool,
        message_template: &str,
        sent_count: i32,
        failed_count: i32,
    ) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO campaigns (message_template, sent_count, failed_count) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(message_template)
        .bind(sent_count)
        .bind(failed_count)
        .fetch_one(db)
        .await?;
        Ok(id)
    }
}
