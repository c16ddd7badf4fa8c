use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use campaigntext_backend::{
    error::AppError,
    handlers::messaging::{self, SendMessagePayload},
    models::assignment::AssignmentStatus,
    services::sms::SmsSender,
};
use sqlx::PgPool;

mod support;
use support::{seed_contact, seed_session, test_config, FakeSms};

fn send_payload(volunteer_id: i64, assignment_id: i64) -> SendMessagePayload {
    SendMessagePayload {
        volunteer_id,
        assignment_id,
        message: "Hi Rosa, will you vote on Tuesday?".into(),
        account_sid: None,
        auth_token: None,
        from: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn send_records_message_and_marks_sent(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550101", "Rosa", "Marin", "Austin").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "pending").await;

    let fake = Arc::new(FakeSms::new());
    let sms: Arc<dyn SmsSender> = fake.clone();

    messaging::send_message(
        State((pool.clone(), test_config())),
        Extension(sms),
        Json(send_payload(ada, assignment)),
    )
    .await
    .expect("send");

    assert_eq!(fake.sent_count(), 1);
    assert_eq!(fake.sent()[0].to, "+15125550101");

    let row = support::assignment_by_id(&pool, assignment).await;
    assert_eq!(row.status, AssignmentStatus::Sent);
    assert!(row.sent_at.is_some());

    let (direction, session_id, volunteer_name): (String, Option<i64>, Option<String>) =
        sqlx::query_as(
            "SELECT direction, session_id, volunteer_name FROM messages WHERE phone = $1",
        )
        .bind("+15125550101")
        .fetch_one(&pool)
        .await
        .expect("message row");
    assert_eq!(direction, "outbound");
    assert_eq!(session_id, Some(session.id));
    assert_eq!(volunteer_name.as_deref(), Some("Ada"));
}

/// A provider failure surfaces to the caller and leaves the assignment and the
/// message log exactly as they were.
#[sqlx::test(migrations = "./migrations")]
async fn delivery_failure_mutates_nothing(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550102", "Leo", "Park", "Dallas").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "pending").await;

    let sms: Arc<dyn SmsSender> = Arc::new(FakeSms::failing("number unreachable"));

    let err = messaging::send_message(
        State((pool.clone(), test_config())),
        Extension(sms),
        Json(send_payload(ada, assignment)),
    )
    .await
    .expect_err("delivery failure");
    assert!(matches!(err, AppError::Delivery(_)));

    let row = support::assignment_by_id(&pool, assignment).await;
    assert_eq!(row.status, AssignmentStatus::Pending);
    assert!(row.sent_at.is_none());

    let messages = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .expect("count messages");
    assert_eq!(messages, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn send_on_closed_assignment_never_reaches_provider(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550103", "Mia", "Cole", "Waco").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment =
        support::seed_assignment(&pool, session.id, Some(ada), contact, "completed").await;

    let fake = Arc::new(FakeSms::new());
    let sms: Arc<dyn SmsSender> = fake.clone();

    let err = messaging::send_message(
        State((pool.clone(), test_config())),
        Extension(sms),
        Json(send_payload(ada, assignment)),
    )
    .await
    .expect_err("terminal assignment");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(fake.sent_count(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn complete_sets_timestamp_and_is_terminal(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550104", "Sam", "Ruiz", "Plano").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment =
        support::seed_assignment(&pool, session.id, Some(ada), contact, "in_conversation").await;

    messaging::complete_assignment(State((pool.clone(), test_config())), Path(assignment))
        .await
        .expect("complete");

    let row = support::assignment_by_id(&pool, assignment).await;
    assert_eq!(row.status, AssignmentStatus::Completed);
    assert!(row.completed_at.is_some());

    // Skip on a completed assignment is rejected, not silently applied.
    let err = messaging::skip_assignment(State((pool.clone(), test_config())), Path(assignment))
        .await
        .expect_err("skip after complete");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(
        support::assignment_by_id(&pool, assignment).await.status,
        AssignmentStatus::Completed
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn skip_is_not_reachable_from_in_conversation(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550105", "Ana", "Vega", "Frisco").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment =
        support::seed_assignment(&pool, session.id, Some(ada), contact, "in_conversation").await;

    let err = messaging::skip_assignment(State((pool.clone(), test_config())), Path(assignment))
        .await
        .expect_err("skip in conversation");
    assert!(matches!(err, AppError::Conflict(_)));

    // Pending and sent are skippable.
    let pending = support::seed_assignment(&pool, session.id, Some(ada), contact, "pending").await;
    messaging::skip_assignment(State((pool.clone(), test_config())), Path(pending))
        .await
        .expect("skip pending");
    assert_eq!(
        support::assignment_by_id(&pool, pending).await.status,
        AssignmentStatus::Skipped
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn complete_unknown_assignment_is_not_found(pool: PgPool) {
    let err = messaging::complete_assignment(State((pool, test_config())), Path(424242))
        .await
        .expect_err("unknown assignment");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn conversation_endpoint_returns_session_thread(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550106", "Kai", "Ito", "Hutto").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "sent").await;

    sqlx::query(
        "INSERT INTO messages (phone, body, direction, session_id, volunteer_name) \
         VALUES ($1, 'Hi Kai!', 'outbound', $2, 'Ada'), ($1, 'Who is this?', 'inbound', $2, NULL)",
    )
    .bind("+15125550106")
    .bind(session.id)
    .execute(&pool)
    .await
    .expect("seed messages");

    let response =
        messaging::get_conversation(State((pool.clone(), test_config())), Path(assignment))
            .await
            .expect("conversation");
    let messages = response.0["messages"].as_array().expect("array").clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["direction"], "outbound");
    assert_eq!(messages[1]["direction"], "inbound");
    assert_eq!(response.0["assignment"]["phone"], "+15125550106");
}
