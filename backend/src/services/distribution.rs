//! Work distribution across a session's volunteers.
//!
//! Two-tier redistribution when a volunteer drops offline: untouched pending
//! work is dealt round-robin, live conversations go one at a time to whoever
//! is least loaded at that moment. When a volunteer returns, conversations
//! that were taken from them snap back, and their queue is topped up from the
//! unowned pool.
//!
//! Every entry point expects to run on a transaction connection that has taken
//! the session's advisory lock (see [`lock_session`]), so concurrent triggers
//! on the same session serialize instead of interleaving.

use sqlx::PgConnection;

use crate::error::AppError;
use crate::repositories::{AssignmentRepository, VolunteerRepository};

/// Fresh pending assignments handed to a volunteer on reconnect.
pub const TOP_UP_BATCH: i64 = 20;

#[derive(Debug, Default, Clone, Copy)]
pub struct RedistributionReport {
    pub pending_moved: u64,
    pub conversations_moved: u64,
    /// Assignments left parked with the offline volunteer because nobody else
    /// was online.
    pub stranded: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReconnectReport {
    pub snapped_back: u64,
    pub topped_up: u64,
}

/// Serialize compound operations per session. Advisory transaction locks
/// release automatically at commit or rollback.
pub async fn lock_session(conn: &mut PgConnection, session_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(session_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(())
}

/// Move a departing volunteer's in-flight work to the remaining online
/// volunteers. With nobody online the work stays put, stalled until someone
/// reconnects.
pub async fn redistribute_offline(
    conn: &mut PgConnection,
    session_id: i64,
    from_volunteer_id: i64,
) -> Result<RedistributionReport, AppError> {
    let assignments = AssignmentRepository::new();
    let volunteers = VolunteerRepository::new();

    let pending = assignments
        .pending_ids(&mut *conn, session_id, from_volunteer_id)
        .await?;
    let conversations = assignments
        .conversation_ids(&mut *conn, session_id, from_volunteer_id)
        .await?;

    let online = volunteers
        .online_volunteers(&mut *conn, session_id, Some(from_volunteer_id))
        .await?;
    if online.is_empty() {
        return Ok(RedistributionReport {
            stranded: (pending.len() + conversations.len()) as u64,
            ..Default::default()
        });
    }

    let mut report = RedistributionReport::default();

    for (i, assignment_id) in pending.iter().enumerate() {
        let target = &online[i % online.len()];
        assignments
            .reassign(&mut *conn, *assignment_id, target.id, from_volunteer_id)
            .await?;
        report.pending_moved += 1;
    }

    // Least-loaded is recomputed per conversation so moving a big backlog
    // keeps the remaining volunteers level with each other.
    for assignment_id in conversations {
        let target = volunteers
            .least_loaded_online(&mut *conn, session_id, from_volunteer_id)
            .await?;
        match target {
            Some(target) => {
                assignments
                    .reassign(&mut *conn, assignment_id, target.id, from_volunteer_id)
                    .await?;
                report.conversations_moved += 1;
            }
            None => report.stranded += 1,
        }
    }

    Ok(report)
}

/// A volunteer came back online: return their conversations, wipe provenance
/// markers on everything they now own, then top up their queue from the
/// unowned pool.
pub async fn snap_back_and_top_up(
    conn: &mut PgConnection,
    session_id: i64,
    volunteer_id: i64,
) -> Result<ReconnectReport, AppError> {
    let assignments = AssignmentRepository::new();

    let snapped_back = assignments
        .snap_back_conversations(&mut *conn, session_id, volunteer_id)
        .await?;
    assignments
        .clear_provenance(&mut *conn, session_id, volunteer_id)
        .await?;
    let topped_up = assignments
        .assign_unowned_batch(&mut *conn, session_id, volunteer_id, TOP_UP_BATCH)
        .await?;

    Ok(ReconnectReport {
        snapped_back,
        topped_up,
    })
}

/// auto_split allocation for a volunteer joining for the first time: an even
/// share of whatever is still unowned. Queues that were already handed out are
/// not rebalanced.
pub async fn split_initial_batch(
    conn: &mut PgConnection,
    session_id: i64,
    volunteer_id: i64,
) -> Result<u64, AppError> {
    let assignments = AssignmentRepository::new();
    let volunteers = VolunteerRepository::new();

    let unowned = assignments
        .count_unowned_pending(&mut *conn, session_id)
        .await?;
    if unowned == 0 {
        return Ok(0);
    }
    let online = volunteers.online_count(&mut *conn, session_id).await?.max(1);
    let share = (unowned as u64).div_ceil(online as u64) as i64;

    assignments
        .assign_unowned_batch(&mut *conn, session_id, volunteer_id, share)
        .await
}

/// Claim-mode pull: one unowned pending assignment, or nothing.
pub async fn claim_next(
    conn: &mut PgConnection,
    session_id: i64,
    volunteer_id: i64,
) -> Result<Option<i64>, AppError> {
    AssignmentRepository::new()
        .claim_next(&mut *conn, session_id, volunteer_id)
        .await
}
