use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::message::MessageDirection,
    repositories::{CampaignRepository, MessageRepository, OptOutRepository},
    services::sms::{SmsCredentials, SmsSender},
    utils::{template, time},
};

/// Cap on per-contact failures echoed back to the dashboard.
const MAX_REPORTED_ERRORS: usize = 20;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastContact {
    pub phone: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendPayload {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[validate(length(min = 1))]
    pub contacts: Vec<BlastContact>,
    #[validate(length(min = 1))]
    pub message_template: String,
    #[serde(default)]
    pub opt_out_footer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendFailure {
    pub phone: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendResponse {
    pub success: bool,
    pub total_contacts: usize,
    pub sent: i32,
    pub failed: i32,
    pub errors: Vec<SendFailure>,
}

/// One-shot blast to a contact list. Each contact is personalized, checked
/// against the opt-out list and the quiet-hours window, and sent with a fixed
/// pacing delay between provider calls. Per-contact failures never abort the
/// rest of the batch.
pub async fn bulk_send(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(sms): Extension<Arc<dyn SmsSender>>,
    Json(payload): Json<BulkSendPayload>,
) -> Result<Json<BulkSendResponse>, AppError> {
    payload.validate()?;
    let credentials = SmsCredentials::resolve(
        payload.account_sid.clone(),
        payload.auth_token.clone(),
        payload.from.clone(),
        &config,
    )?;
    let footer = payload
        .opt_out_footer
        .clone()
        .unwrap_or_else(|| config.opt_out_footer.clone());

    let opt_outs = OptOutRepository::new();
    let messages = MessageRepository::new();

    let mut sent = 0i32;
    let mut failed = 0i32;
    let mut errors: Vec<SendFailure> = Vec::new();

    for contact in &payload.contacts {
        if opt_outs.is_opted_out(&pool, &contact.phone).await? {
            failed += 1;
            errors.push(SendFailure {
                phone: contact.phone.clone(),
                reason: "Opted out".to_string(),
            });
            continue;
        }

        if !time::within_sending_hours(
            Utc::now(),
            config.time_zone,
            config.quiet_hours_start,
            config.quiet_hours_end,
        ) {
            failed += 1;
            errors.push(SendFailure {
                phone: contact.phone.clone(),
                reason: format!(
                    "Outside allowed sending hours ({}:00-{}:00)",
                    config.quiet_hours_start, config.quiet_hours_end
                ),
            });
            continue;
        }

        let body = template::with_footer(
            &template::render(
                &payload.message_template,
                contact.first_name.as_deref().unwrap_or(""),
                contact.last_name.as_deref().unwrap_or(""),
                contact.city.as_deref().unwrap_or(""),
            ),
            &footer,
        );

        match sms.send(&credentials, &contact.phone, &body).await {
            Ok(()) => {
                sent += 1;
                let mut conn = pool.acquire().await?;
                messages
                    .insert(
                        &mut conn,
                        &contact.phone,
                        &body,
                        MessageDirection::Outbound,
                        None,
                        None,
                    )
                    .await?;
            }
            Err(err) => {
                failed += 1;
                errors.push(SendFailure {
                    phone: contact.phone.clone(),
                    reason: err.to_string(),
                });
            }
        }

        if config.send_pacing_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(config.send_pacing_ms)).await;
        }
    }

    CampaignRepository::new()
        .record(&pool, &payload.message_template, sent, failed)
        .await?;
    tracing::info!(sent, failed, "bulk send finished");

    errors.truncate(MAX_REPORTED_ERRORS);
    Ok(Json(BulkSendResponse {
        success: true,
        total_contacts: payload.contacts.len(),
        sent,
        failed,
        errors,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionPayload {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Validate provider credentials without sending anything.
pub async fn test_connection(
    State((_pool, config)): State<(PgPool, Config)>,
    Extension(sms): Extension<Arc<dyn SmsSender>>,
    Json(payload): Json<TestConnectionPayload>,
) -> Result<Json<Value>, AppError> {
    // The account check needs no sending number.
    let account_sid = payload
        .account_sid
        .or_else(|| config.sms_account_sid.clone());
    let auth_token = payload.auth_token.or_else(|| config.sms_auth_token.clone());
    let (account_sid, auth_token) = match (account_sid, auth_token) {
        (Some(sid), Some(token)) => (sid, token),
        _ => return Err(AppError::BadRequest("Missing credentials.".to_string())),
    };
    let credentials = SmsCredentials {
        account_sid,
        auth_token,
        from: payload
            .from
            .or_else(|| config.sms_from_number.clone())
            .unwrap_or_default(),
    };
    let info = sms
        .check_credentials(&credentials)
        .await
        .map_err(AppError::from)?;
    Ok(Json(json!({
        "success": true,
        "accountName": info.account_name,
        "status": info.status,
    })))
}
