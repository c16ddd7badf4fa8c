//! Transaction helpers shared by handlers that run compound operations.

use crate::error::AppError;
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

/// Begin a database transaction. Dropping the returned handle without
/// committing rolls everything back.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'_>, AppError> {
    db.begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}
