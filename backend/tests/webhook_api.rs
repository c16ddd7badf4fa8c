use axum::body::to_bytes;
use axum::extract::State;
use axum::Form;
use campaigntext_backend::{
    handlers::webhook::{self, InboundSmsForm},
    models::assignment::AssignmentStatus,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;

mod support;
use support::{seed_contact, seed_session, seed_session_with, test_config};

fn inbound(from: &str, body: &str) -> Form<InboundSmsForm> {
    Form(InboundSmsForm {
        from: from.into(),
        to: Some("+15550000000".into()),
        body: Some(body.into()),
    })
}

async fn post_incoming(pool: &PgPool, from: &str, body: &str) -> String {
    let response = webhook::incoming(State((pool.clone(), test_config())), inbound(from, body))
        .await
        .expect("webhook");
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

#[sqlx::test(migrations = "./migrations")]
async fn reply_matches_sent_assignment_and_opens_conversation(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550200", "Rosa", "Marin", "Austin").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "sent").await;

    post_incoming(&pool, "+15125550200", "Yes, I'll be there").await;

    let row = support::assignment_by_id(&pool, assignment).await;
    assert_eq!(row.status, AssignmentStatus::InConversation);
    assert_eq!(row.volunteer_id, Some(ada));

    let (direction, session_id): (String, Option<i64>) =
        sqlx::query_as("SELECT direction, session_id FROM messages WHERE phone = $1")
            .bind("+15125550200")
            .fetch_one(&pool)
            .await
            .expect("message");
    assert_eq!(direction, "inbound");
    assert_eq!(session_id, Some(session.id));
}

/// in_conversation never reverts: a second reply leaves the status alone.
#[sqlx::test(migrations = "./migrations")]
async fn second_reply_keeps_conversation_open(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550201", "Leo", "Park", "Dallas").await;
    let session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "sent").await;

    post_incoming(&pool, "+15125550201", "first reply").await;
    post_incoming(&pool, "+15125550201", "second reply").await;

    assert_eq!(
        support::assignment_by_id(&pool, assignment).await.status,
        AssignmentStatus::InConversation
    );
    let tagged = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM messages WHERE phone = $1 AND session_id = $2",
    )
    .bind("+15125550201")
    .bind(session.id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(tagged, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn unmatched_inbound_is_stored_untagged(pool: PgPool) {
    post_incoming(&pool, "+15125550202", "hello out there").await;

    let (direction, session_id): (String, Option<i64>) =
        sqlx::query_as("SELECT direction, session_id FROM messages WHERE phone = $1")
            .bind("+15125550202")
            .fetch_one(&pool)
            .await
            .expect("message");
    assert_eq!(direction, "inbound");
    assert_eq!(session_id, None);
}

/// Only active sessions participate in matching.
#[sqlx::test(migrations = "./migrations")]
async fn paused_session_assignments_are_not_matched(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550203", "Mia", "Cole", "Waco").await;
    let session =
        seed_session_with(&pool, "auto_split", "paused", Utc::now() + Duration::days(7)).await;
    let ada = support::seed_volunteer(&pool, session.id, "Ada", true).await;
    let assignment = support::seed_assignment(&pool, session.id, Some(ada), contact, "sent").await;

    post_incoming(&pool, "+15125550203", "hello?").await;

    assert_eq!(
        support::assignment_by_id(&pool, assignment).await.status,
        AssignmentStatus::Sent
    );
}

/// Two live assignments for one phone: the most recently texted one wins.
#[sqlx::test(migrations = "./migrations")]
async fn most_recently_sent_assignment_wins(pool: PgPool) {
    let contact = seed_contact(&pool, "+15125550204", "Ana", "Vega", "Frisco").await;
    let old_session = seed_session(&pool, "auto_split").await;
    let new_session = seed_session(&pool, "auto_split").await;
    let ada = support::seed_volunteer(&pool, old_session.id, "Ada", true).await;
    let ben = support::seed_volunteer(&pool, new_session.id, "Ben", true).await;

    let stale = support::seed_assignment(&pool, old_session.id, Some(ada), contact, "sent").await;
    let fresh = support::seed_assignment(&pool, new_session.id, Some(ben), contact, "sent").await;
    sqlx::query("UPDATE p2p_assignments SET sent_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(stale)
        .execute(&pool)
        .await
        .expect("age stale send");

    post_incoming(&pool, "+15125550204", "responding").await;

    assert_eq!(
        support::assignment_by_id(&pool, fresh).await.status,
        AssignmentStatus::InConversation
    );
    assert_eq!(
        support::assignment_by_id(&pool, stale).await.status,
        AssignmentStatus::Sent
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn stop_keyword_opts_out_and_confirms(pool: PgPool) {
    let body = post_incoming(&pool, "+15125550205", "STOP").await;
    assert!(body.contains("<Response><Message>"));
    assert!(body.contains("removed from our list"));

    let opted_out = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM opt_outs WHERE phone = $1)",
    )
    .bind("+15125550205")
    .fetch_one(&pool)
    .await
    .expect("opt out row");
    assert!(opted_out);

    // STOP requests are honored, not archived as inbox traffic.
    let messages = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .expect("count messages");
    assert_eq!(messages, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn keyword_questions_get_auto_replies(pool: PgPool) {
    let body = post_incoming(&pool, "+15125550206", "where do I vote?").await;
    assert!(body.contains("polling location"));

    let body = post_incoming(&pool, "+15125550207", "thanks, talk soon").await;
    assert_eq!(body, "<Response></Response>");
}
