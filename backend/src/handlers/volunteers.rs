use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        assignment::AssignmentWithContact,
        session::AssignmentMode,
        volunteer::{JoinSessionPayload, JoinSessionResponse, VolunteerStatusPayload},
    },
    repositories::{
        transaction, ActivityLogRepository, AssignmentRepository, SessionRepository,
        VolunteerRepository,
    },
    services::distribution,
    utils::template,
};

/// Join (or re-join) a session by code. Side effects run inside the same
/// transaction as the online flip: a volunteer never observes themselves
/// online with no queue adjustment.
pub async fn join_session(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<JoinSessionPayload>,
) -> Result<Json<JoinSessionResponse>, AppError> {
    payload.validate()?;

    let session = SessionRepository::new()
        .find_active_by_code(&pool, &payload.code)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid or inactive join code.".to_string()))?;
    if session.code_expires_at < Utc::now() {
        return Err(AppError::Gone("Join code has expired.".to_string()));
    }

    let volunteers = VolunteerRepository::new();
    let mut tx = transaction::begin_transaction(&pool).await?;
    distribution::lock_session(&mut tx, session.id).await?;

    let volunteer = match volunteers
        .find_by_session_and_name(&mut tx, session.id, &payload.name)
        .await?
    {
        Some(existing) => {
            volunteers.set_online(&mut tx, existing.id, true).await?;
            let report =
                distribution::snap_back_and_top_up(&mut tx, session.id, existing.id).await?;
            tracing::info!(
                volunteer_id = existing.id,
                snapped_back = report.snapped_back,
                topped_up = report.topped_up,
                "volunteer re-joined"
            );
            existing
        }
        None => {
            let created = volunteers.create(&mut tx, session.id, &payload.name).await?;
            if session.assignment_mode == AssignmentMode::AutoSplit {
                let share =
                    distribution::split_initial_batch(&mut tx, session.id, created.id).await?;
                tracing::info!(volunteer_id = created.id, share, "initial batch assigned");
            }
            created
        }
    };

    ActivityLogRepository::new()
        .log(
            &mut tx,
            &format!("{} joined P2P session: {}", volunteer.name, session.name),
        )
        .await?;
    transaction::commit_transaction(tx).await?;

    Ok(Json(JoinSessionResponse {
        success: true,
        volunteer_id: volunteer.id,
        session_id: session.id,
        session_name: session.name,
    }))
}

/// Toggle a volunteer online/offline, redistributing or reclaiming their work
/// atomically with the flip.
pub async fn set_status(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
    Json(payload): Json<VolunteerStatusPayload>,
) -> Result<Json<Value>, AppError> {
    let volunteers = VolunteerRepository::new();
    let volunteer = volunteers
        .find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Volunteer not found.".to_string()))?;

    let mut tx = transaction::begin_transaction(&pool).await?;
    distribution::lock_session(&mut tx, volunteer.session_id).await?;
    volunteers
        .set_online(&mut tx, volunteer.id, payload.is_online)
        .await?;

    if payload.is_online {
        let report =
            distribution::snap_back_and_top_up(&mut tx, volunteer.session_id, volunteer.id)
                .await?;
        tracing::info!(
            volunteer_id = volunteer.id,
            snapped_back = report.snapped_back,
            topped_up = report.topped_up,
            "volunteer back online"
        );
    } else {
        let report =
            distribution::redistribute_offline(&mut tx, volunteer.session_id, volunteer.id)
                .await?;
        tracing::info!(
            volunteer_id = volunteer.id,
            pending_moved = report.pending_moved,
            conversations_moved = report.conversations_moved,
            stranded = report.stranded,
            "volunteer went offline"
        );
    }
    transaction::commit_transaction(tx).await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: i64,
    pub sent: i64,
    pub remaining: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub assignment: Option<AssignmentWithContact>,
    pub resolved_message: Option<String>,
    pub active_conversations: Vec<AssignmentWithContact>,
    pub stats: QueueStats,
    pub message_template: String,
}

/// A volunteer's work view: next text to send, open conversations, progress.
/// In claim mode this is also the pull point for fresh work.
pub async fn get_queue(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<i64>,
) -> Result<Json<QueueResponse>, AppError> {
    let volunteer = VolunteerRepository::new()
        .find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Volunteer not found.".to_string()))?;
    let session = SessionRepository::new()
        .find_by_id(&pool, volunteer.session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found.".to_string()))?;

    if session.assignment_mode == AssignmentMode::Claim {
        let mut tx = transaction::begin_transaction(&pool).await?;
        distribution::lock_session(&mut tx, session.id).await?;
        distribution::claim_next(&mut tx, session.id, volunteer.id).await?;
        transaction::commit_transaction(tx).await?;
    }

    let assignments = AssignmentRepository::new();
    let assignment = assignments
        .next_pending_with_contact(&pool, volunteer.id)
        .await?;
    let active_conversations = assignments
        .active_conversations_with_contact(&pool, volunteer.id)
        .await?;
    let stats = QueueStats {
        total: assignments.count_for_volunteer(&pool, volunteer.id).await?,
        sent: assignments
            .count_sent_for_volunteer(&pool, volunteer.id)
            .await?,
        remaining: assignments
            .count_pending_for_volunteer(&pool, volunteer.id)
            .await?,
    };

    let resolved_message = assignment.as_ref().map(|a| {
        template::render(
            &session.message_template,
            &a.first_name,
            &a.last_name,
            &a.city,
        )
    });

    Ok(Json(QueueResponse {
        assignment,
        resolved_message,
        active_conversations,
        stats,
        message_template: session.message_template,
    }))
}
