use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::message::MessageDirection,
    repositories::{MessageRepository, OptOutRepository},
    services::sms::{SmsCredentials, SmsSender},
};

/// Inbox view: every stored message plus the opt-out list.
pub async fn list_messages(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let messages = MessageRepository::new().find_all(&pool).await?;
    let opted_out = OptOutRepository::new().find_all(&pool).await?;
    Ok(Json(json!({ "messages": messages, "optedOut": opted_out })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub body: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Manual one-off reply from the inbox, outside any P2P session.
pub async fn send_reply(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(sms): Extension<Arc<dyn SmsSender>>,
    Json(payload): Json<ReplyPayload>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let credentials = SmsCredentials::resolve(
        payload.account_sid.clone(),
        payload.auth_token.clone(),
        payload.from.clone(),
        &config,
    )?;

    sms.send(&credentials, &payload.to, &payload.body)
        .await
        .map_err(AppError::from)?;

    let mut conn = pool.acquire().await.map_err(AppError::from)?;
    MessageRepository::new()
        .insert(
            &mut conn,
            &payload.to,
            &payload.body,
            MessageDirection::Outbound,
            None,
            None,
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}
