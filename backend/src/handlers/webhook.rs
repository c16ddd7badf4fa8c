use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::message::MessageDirection,
    repositories::{transaction, AssignmentRepository, MessageRepository, OptOutRepository},
    utils::phone,
};

/// Keywords that trigger automatic opt-out, per TCPA.
const STOP_KEYWORDS: &[&str] = &["stop", "unsubscribe", "cancel", "quit", "end"];

const OPT_OUT_CONFIRMATION: &str =
    "You've been removed from our list and won't receive further messages.";

/// The provider posts inbound messages as form fields.
#[derive(Debug, Deserialize)]
pub struct InboundSmsForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
}

fn twiml(message: Option<&str>) -> Response {
    let body = match message {
        Some(text) => format!("<Response><Message>{}</Message></Response>", text),
        None => "<Response></Response>".to_string(),
    };
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

/// Inbound webhook. STOP requests are honored first; everything else is
/// matched against live P2P assignments for the sender's phone (most recent
/// send wins) before falling back to the plain inbox.
pub async fn incoming(
    State((pool, _config)): State<(PgPool, Config)>,
    Form(inbound): Form<InboundSmsForm>,
) -> Result<Response, AppError> {
    let sender = phone::normalize(&inbound.from);
    let body = inbound.body.unwrap_or_default();
    let text = body.trim().to_lowercase();

    tracing::info!(from = %sender, "inbound message");

    if STOP_KEYWORDS.contains(&text.as_str()) {
        OptOutRepository::new().add(&pool, &sender).await?;
        tracing::info!(from = %sender, "opted out");
        return Ok(twiml(Some(OPT_OUT_CONFIRMATION)));
    }

    let mut tx = transaction::begin_transaction(&pool).await?;
    let assignments = AssignmentRepository::new();
    let session_id = match assignments.match_inbound(&mut tx, &sender).await? {
        Some(assignment) => {
            assignments
                .mark_in_conversation(&mut tx, assignment.id)
                .await?;
            Some(assignment.session_id)
        }
        None => None,
    };
    MessageRepository::new()
        .insert(
            &mut tx,
            &sender,
            &body,
            MessageDirection::Inbound,
            session_id,
            None,
        )
        .await?;
    transaction::commit_transaction(tx).await?;

    Ok(twiml(auto_reply(&text)))
}

/// Canned answers for the questions volunteers field constantly.
fn auto_reply(message: &str) -> Option<&'static str> {
    const POLLING: &[&str] = &["poll", "polling", "vote", "where", "location"];
    const HOURS: &[&str] = &["time", "open", "close", "hours", "when"];
    const REGISTER: &[&str] = &["register", "registration", "sign up", "signup"];
    const INFO: &[&str] = &["who", "what", "platform", "policy", "stance"];

    if POLLING.iter().any(|k| message.contains(k)) {
        return Some(
            "Find your polling location at vote.gov or call your county clerk. \
             Polls are open 7am-7pm on Election Day!",
        );
    }
    if HOURS.iter().any(|k| message.contains(k)) {
        return Some(
            "Polls are open 7:00 AM - 7:00 PM on Election Day. \
             Early voting may have different hours, check vote.gov!",
        );
    }
    if REGISTER.iter().any(|k| message.contains(k)) {
        return Some("Check your registration or register at vote.org. Don't miss the deadline!");
    }
    if INFO.iter().any(|k| message.contains(k)) {
        return Some("Learn more about our campaign at our website. We'd love your support!");
    }
    None
}
