use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        session::{
            AssignmentMode, CreateSessionPayload, CreateSessionResponse, SessionDetail,
            SessionSummary, UpdateSessionPayload,
        },
        volunteer::VolunteerSummary,
    },
    repositories::{
        transaction, ActivityLogRepository, AssignmentRepository, SessionRepository,
        VolunteerRepository,
    },
};

/// Short numeric code volunteers type to join. Uniqueness among live sessions
/// is not enforced; lookups resolve collisions toward the newest session.
fn generate_join_code() -> String {
    rand::thread_rng().gen_range(1000..10000).to_string()
}

pub async fn create_session(
    State((pool, config)): State<(PgPool, Config)>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    payload.validate()?;

    let join_code = generate_join_code();
    let expires_at = Utc::now() + Duration::days(config.join_code_expiry_days);
    let mode = payload.assignment_mode.unwrap_or(AssignmentMode::AutoSplit);

    let mut tx = transaction::begin_transaction(&pool).await?;
    let session = SessionRepository::new()
        .create(
            &mut tx,
            &payload.name,
            &payload.message_template,
            mode,
            &join_code,
            expires_at,
        )
        .await?;
    let enqueued = AssignmentRepository::new()
        .create_batch(&mut tx, session.id, &payload.contact_ids)
        .await?;
    ActivityLogRepository::new()
        .log(
            &mut tx,
            &format!(
                "P2P session created: {} ({} contacts)",
                session.name, enqueued
            ),
        )
        .await?;
    transaction::commit_transaction(tx).await?;

    tracing::info!(session_id = session.id, contacts = enqueued, "session created");

    Ok(Json(CreateSessionResponse {
        success: true,
        id: session.id,
        join_code: session.join_code,
    }))
}

pub async fn list_sessions(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let sessions_repo = SessionRepository::new();
    let mut summaries = Vec::new();
    for session in sessions_repo.find_all(&pool).await? {
        let total_contacts = sessions_repo.total_contacts(&pool, session.id).await?;
        let sent = sessions_repo.total_sent(&pool, session.id).await?;
        let volunteer_count = sessions_repo.volunteer_count(&pool, session.id).await?;
        let online_count = sessions_repo.online_count(&pool, session.id).await?;
        summaries.push(SessionSummary {
            session,
            total_contacts,
            sent,
            volunteer_count,
            online_count,
        });
    }
    Ok(Json(json!({ "sessions": summaries })))
}

pub async fn get_session(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let sessions_repo = SessionRepository::new();
    let assignments = AssignmentRepository::new();

    let session = sessions_repo
        .find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found.".to_string()))?;

    let mut volunteers = Vec::new();
    for volunteer in VolunteerRepository::new()
        .find_all_by_session(&pool, session.id)
        .await?
    {
        let sent = assignments
            .count_sent_for_volunteer(&pool, volunteer.id)
            .await?;
        let active_chats = assignments
            .count_in_conversation_for_volunteer(&pool, volunteer.id)
            .await?;
        let remaining = assignments
            .count_pending_for_volunteer(&pool, volunteer.id)
            .await?;
        volunteers.push(VolunteerSummary {
            volunteer,
            sent,
            active_chats,
            remaining,
        });
    }

    let detail = SessionDetail {
        total_contacts: sessions_repo.total_contacts(&pool, session.id).await?,
        total_sent: sessions_repo.total_sent(&pool, session.id).await?,
        total_replies: sessions_repo.total_replies(&pool, session.id).await?,
        remaining: sessions_repo.remaining(&pool, session.id).await?,
        session,
        volunteers,
    };

    Ok(Json(json!({ "session": detail })))
}

pub async fn update_session(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSessionPayload>,
) -> Result<Json<Value>, AppError> {
    let updated = SessionRepository::new()
        .update(&pool, id, payload.status, payload.assignment_mode)
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound("Session not found.".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

/// Cascade-deletes the session's volunteers and assignments.
pub async fn delete_session(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let session = SessionRepository::new()
        .find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found.".to_string()))?;

    let mut tx = transaction::begin_transaction(&pool).await?;
    SessionRepository::new().delete(&mut tx, session.id).await?;
    ActivityLogRepository::new()
        .log(&mut tx, &format!("P2P session deleted: {}", session.name))
        .await?;
    transaction::commit_transaction(tx).await?;

    Ok(Json(json!({ "success": true })))
}
