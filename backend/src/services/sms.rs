//! SMS provider boundary.
//!
//! Handlers talk to the provider through [`SmsSender`] so tests can swap in a
//! recording fake. The real implementation posts to the Twilio REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
}

impl SmsCredentials {
    /// Credentials supplied with the request win over the configured defaults.
    pub fn resolve(
        account_sid: Option<String>,
        auth_token: Option<String>,
        from: Option<String>,
        config: &Config,
    ) -> Result<Self, AppError> {
        let account_sid = account_sid.or_else(|| config.sms_account_sid.clone());
        let auth_token = auth_token.or_else(|| config.sms_auth_token.clone());
        let from = from.or_else(|| config.sms_from_number.clone());
        match (account_sid, auth_token, from) {
            (Some(account_sid), Some(auth_token), Some(from)) => Ok(Self {
                account_sid,
                auth_token,
                from,
            }),
            _ => Err(AppError::BadRequest(
                "SMS provider credentials required.".to_string(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("provider rejected message: {0}")]
    Rejected(String),
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_name: String,
    pub status: String,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Deliver one message. Must not be retried by callers; a failure leaves
    /// whatever triggered the send unchanged.
    async fn send(
        &self,
        credentials: &SmsCredentials,
        to: &str,
        body: &str,
    ) -> Result<(), DeliveryError>;

    /// Validate credentials against the provider account endpoint.
    async fn check_credentials(
        &self,
        credentials: &SmsCredentials,
    ) -> Result<AccountInfo, DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
}

impl TwilioSender {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("campaigntext-backend/0.1")
            .build()?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioAccountBody {
    friendly_name: Option<String>,
    status: Option<String>,
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(
        &self,
        credentials: &SmsCredentials,
        to: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API_BASE, credentials.account_sid
        );
        let params = [("To", to), ("From", credentials.from.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let detail = response
            .json::<TwilioErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        Err(DeliveryError::Rejected(detail))
    }

    async fn check_credentials(
        &self,
        credentials: &SmsCredentials,
    ) -> Result<AccountInfo, DeliveryError> {
        let url = format!(
            "{}/Accounts/{}.json",
            TWILIO_API_BASE, credentials.account_sid
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Credentials(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response
            .json::<TwilioAccountBody>()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(AccountInfo {
            account_name: body.friendly_name.unwrap_or_default(),
            status: body.status.unwrap_or_default(),
        })
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Credentials(msg) => {
                AppError::Unauthorized(format!("Invalid credentials: {}", msg))
            }
            other => AppError::Delivery(other.to_string()),
        }
    }
}
