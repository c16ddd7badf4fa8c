use anyhow::anyhow;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    /// Fallback SMS provider credentials used when a request does not carry
    /// its own. All three must be set for the fallback to apply.
    pub sms_account_sid: Option<String>,
    pub sms_auth_token: Option<String>,
    pub sms_from_number: Option<String>,
    pub opt_out_footer: String,
    /// Campaign-local timezone for the quiet-hours window.
    pub time_zone: Tz,
    pub quiet_hours_start: u32,
    pub quiet_hours_end: u32,
    pub join_code_expiry_days: i64,
    /// Delay between messages in bulk sends, to stay under provider rate limits.
    pub send_pacing_ms: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/campaigntext".to_string());

        let sms_account_sid = env::var("SMS_ACCOUNT_SID").ok().filter(|v| !v.is_empty());
        let sms_auth_token = env::var("SMS_AUTH_TOKEN").ok().filter(|v| !v.is_empty());
        let sms_from_number = env::var("SMS_FROM_NUMBER").ok().filter(|v| !v.is_empty());

        let opt_out_footer = env::var("OPT_OUT_FOOTER")
            .unwrap_or_else(|_| "Reply STOP to opt out.".to_string());

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let quiet_hours_start = env::var("QUIET_HOURS_START")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .unwrap_or(8);

        let quiet_hours_end = env::var("QUIET_HOURS_END")
            .unwrap_or_else(|_| "21".to_string())
            .parse()
            .unwrap_or(21);

        let join_code_expiry_days = env::var("JOIN_CODE_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let send_pacing_ms = env::var("SEND_PACING_MS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        Ok(Config {
            database_url,
            sms_account_sid,
            sms_auth_token,
            sms_from_number,
            opt_out_footer,
            time_zone,
            quiet_hours_start,
            quiet_hours_end,
            join_code_expiry_days,
            send_pacing_ms,
        })
    }
}
