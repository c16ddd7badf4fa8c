use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::message::MessageDirection,
    repositories::{transaction, AssignmentRepository, MessageRepository, VolunteerRepository},
    services::sms::{SmsCredentials, SmsSender},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub volunteer_id: i64,
    pub assignment_id: i64,
    #[validate(length(min = 1))]
    pub message: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Send one P2P text. The provider call comes first; the outbound message and
/// the `sent` transition are only recorded after the provider accepted it, so
/// a delivery failure leaves the assignment exactly as it was.
pub async fn send_message(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(sms): Extension<Arc<dyn SmsSender>>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let credentials = SmsCredentials::resolve(
        payload.account_sid.clone(),
        payload.auth_token.clone(),
        payload.from.clone(),
        &config,
    )?;

    let volunteer = VolunteerRepository::new()
        .find_by_id(&pool, payload.volunteer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Volunteer not found.".to_string()))?;
    let assignments = AssignmentRepository::new();
    let assignment = assignments
        .find_with_contact(&pool, payload.assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found.".to_string()))?;
    if assignment.status.is_terminal() {
        return Err(AppError::Conflict(
            "Assignment is already closed.".to_string(),
        ));
    }

    sms.send(&credentials, &assignment.phone, &payload.message)
        .await
        .map_err(AppError::from)?;

    let mut tx = transaction::begin_transaction(&pool).await?;
    MessageRepository::new()
        .insert(
            &mut tx,
            &assignment.phone,
            &payload.message,
            MessageDirection::Outbound,
            Some(volunteer.session_id),
            Some(&volunteer.name),
        )
        .await?;
    let updated = assignments.mark_sent(&mut tx, assignment.id).await?;
    if updated == 0 {
        // Raced with a reply or a terminal transition since the provider call.
        return Err(AppError::Conflict(
            "Assignment is no longer sendable.".to_string(),
        ));
    }
    transaction::commit_transaction(tx).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn get_conversation(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(assignment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let assignment = AssignmentRepository::new()
        .find_with_contact(&pool, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found.".to_string()))?;

    let messages = MessageRepository::new()
        .conversation(&pool, &assignment.phone, assignment.session_id)
        .await?;

    Ok(Json(json!({ "messages": messages, "assignment": assignment })))
}

/// Terminal transition; completing an already-closed assignment is rejected
/// rather than silently flipping its status.
pub async fn complete_assignment(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let assignments = AssignmentRepository::new();
    let updated = assignments.complete(&pool, id).await?;
    if updated == 0 {
        return match assignments.find_by_id(&pool, id).await? {
            Some(_) => Err(AppError::Conflict(
                "Assignment is already closed.".to_string(),
            )),
            None => Err(AppError::NotFound("Assignment not found.".to_string())),
        };
    }
    Ok(Json(json!({ "success": true })))
}

/// Skipping is only reachable from `pending` or `sent`.
pub async fn skip_assignment(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let assignments = AssignmentRepository::new();
    let updated = assignments.skip(&pool, id).await?;
    if updated == 0 {
        return match assignments.find_by_id(&pool, id).await? {
            Some(_) => Err(AppError::Conflict(
                "Assignment cannot be skipped in its current state.".to_string(),
            )),
            None => Err(AppError::NotFound("Assignment not found.".to_string())),
        };
    }
    Ok(Json(json!({ "success": true })))
}
