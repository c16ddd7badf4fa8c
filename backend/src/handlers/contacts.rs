use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::contact::{CreateContactPayload, ImportContactsPayload},
    repositories::{transaction, ContactRepository},
};

pub async fn list_contacts(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let contacts = ContactRepository::new().find_all(&pool).await?;
    Ok(Json(json!({ "contacts": contacts })))
}

pub async fn create_contact(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<CreateContactPayload>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let id = ContactRepository::new().create(&pool, &payload).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

pub async fn import_contacts(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<ImportContactsPayload>,
) -> Result<Json<Value>, AppError> {
    if payload.contacts.is_empty() {
        return Err(AppError::BadRequest("No contacts provided.".to_string()));
    }
    let mut tx = transaction::begin_transaction(&pool).await?;
    let added = ContactRepository::new()
        .create_many(&mut tx, &payload.contacts)
        .await?;
    transaction::commit_transaction(tx).await?;
    Ok(Json(json!({ "success": true, "added": added })))
}

pub async fn delete_contact(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    ContactRepository::new().delete(&pool, id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_all_contacts(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    ContactRepository::new().delete_all(&pool).await?;
    Ok(Json(json!({ "success": true })))
}
