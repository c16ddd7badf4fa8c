use axum::extract::{Path, State};
use axum::Json;
use campaigntext_backend::{
    error::AppError,
    handlers::sessions,
    models::session::{
        AssignmentMode, CreateSessionPayload, SessionStatus, UpdateSessionPayload,
    },
};
use chrono::{Duration, Utc};
use sqlx::PgPool;

mod support;
use support::{seed_contacts, seed_session_with, test_config};

#[sqlx::test(migrations = "./migrations")]
async fn create_session_enqueues_pending_assignments(pool: PgPool) {
    let contact_ids = seed_contacts(&pool, 3).await;
    let config = test_config();

    let response = sessions::create_session(
        State((pool.clone(), config)),
        Json(CreateSessionPayload {
            name: "GOTV week 1".into(),
            message_template: "Hi {firstName}!".into(),
            assignment_mode: None,
            contact_ids: contact_ids.clone(),
        }),
    )
    .await
    .expect("create session");

    assert!(response.0.success);
    assert_eq!(response.0.join_code.len(), 4);
    assert!(response.0.join_code.chars().all(|c| c.is_ascii_digit()));

    let pending_unowned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM p2p_assignments \
         WHERE session_id = $1 AND status = 'pending' AND volunteer_id IS NULL",
    )
    .bind(response.0.id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(pending_unowned, contact_ids.len() as i64);

    let logged = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM activity_log WHERE message LIKE 'P2P session created:%'",
    )
    .fetch_one(&pool)
    .await
    .expect("count log");
    assert_eq!(logged, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn create_session_rejects_empty_contact_list(pool: PgPool) {
    let config = test_config();
    let err = sessions::create_session(
        State((pool.clone(), config)),
        Json(CreateSessionPayload {
            name: "No contacts".into(),
            message_template: "Hi!".into(),
            assignment_mode: None,
            contact_ids: vec![],
        }),
    )
    .await
    .expect_err("empty contact list must fail");
    assert!(matches!(err, AppError::Validation(_)));

    let sessions_created =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM p2p_sessions")
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(sessions_created, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn create_session_rejects_missing_template(pool: PgPool) {
    let contact_ids = seed_contacts(&pool, 1).await;
    let config = test_config();
    let err = sessions::create_session(
        State((pool, config)),
        Json(CreateSessionPayload {
            name: "Missing template".into(),
            message_template: "".into(),
            assignment_mode: Some(AssignmentMode::Claim),
            contact_ids,
        }),
    )
    .await
    .expect_err("missing template must fail");
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn get_session_returns_counters(pool: PgPool) {
    let contact_ids = seed_contacts(&pool, 2).await;
    let session = seed_session_with(&pool, "auto_split", "active", Utc::now() + Duration::days(7)).await;
    support::seed_assignment(&pool, session.id, None, contact_ids[0], "pending").await;
    support::seed_assignment(&pool, session.id, None, contact_ids[1], "pending").await;

    let config = test_config();
    let response = sessions::get_session(State((pool, config)), Path(session.id))
        .await
        .expect("get session");

    let detail = &response.0["session"];
    assert_eq!(detail["totalContacts"], 2);
    assert_eq!(detail["totalSent"], 0);
    assert_eq!(detail["remaining"], 2);
    assert_eq!(detail["join_code"], "4242");
}

#[sqlx::test(migrations = "./migrations")]
async fn get_session_unknown_id_is_not_found(pool: PgPool) {
    let config = test_config();
    let err = sessions::get_session(State((pool, config)), Path(999))
        .await
        .expect_err("unknown session");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn update_session_changes_status_and_mode(pool: PgPool) {
    let session = seed_session_with(&pool, "auto_split", "active", Utc::now() + Duration::days(7)).await;
    let config = test_config();

    sessions::update_session(
        State((pool.clone(), config)),
        Path(session.id),
        Json(UpdateSessionPayload {
            status: Some(SessionStatus::Paused),
            assignment_mode: Some(AssignmentMode::Claim),
        }),
    )
    .await
    .expect("update session");

    let (status, mode): (String, String) = sqlx::query_as(
        "SELECT status, assignment_mode FROM p2p_sessions WHERE id = $1",
    )
    .bind(session.id)
    .fetch_one(&pool)
    .await
    .expect("fetch session");
    assert_eq!(status, "paused");
    assert_eq!(mode, "claim");
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_session_cascades_to_volunteers_and_assignments(pool: PgPool) {
    let contact_ids = seed_contacts(&pool, 1).await;
    let session = seed_session_with(&pool, "auto_split", "active", Utc::now() + Duration::days(7)).await;
    let volunteer = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    support::seed_assignment(&pool, session.id, Some(volunteer), contact_ids[0], "pending").await;

    let config = test_config();
    sessions::delete_session(State((pool.clone(), config)), Path(session.id))
        .await
        .expect("delete session");

    let volunteers = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM p2p_volunteers")
        .fetch_one(&pool)
        .await
        .expect("count volunteers");
    let assignments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM p2p_assignments")
        .fetch_one(&pool)
        .await
        .expect("count assignments");
    assert_eq!(volunteers, 0);
    assert_eq!(assignments, 0);
}
