use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campaigntext_backend::{
    config::Config,
    db::connection::create_pool,
    handlers, middleware,
    services::sms::{SmsSender, TwilioSender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaigntext_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        time_zone = %config.time_zone,
        quiet_hours_start = config.quiet_hours_start,
        quiet_hours_end = config.quiet_hours_end,
        join_code_expiry_days = config.join_code_expiry_days,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // SMS provider client shared by every handler that sends
    let sms: Arc<dyn SmsSender> = Arc::new(TwilioSender::new()?);

    let app = Router::new()
        // P2P texting sessions
        .route(
            "/api/p2p/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route(
            "/api/p2p/sessions/{id}",
            get(handlers::sessions::get_session)
                .patch(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .route("/api/p2p/join", post(handlers::volunteers::join_session))
        .route(
            "/api/p2p/volunteers/{id}/status",
            axum::routing::patch(handlers::volunteers::set_status),
        )
        .route(
            "/api/p2p/volunteers/{id}/queue",
            get(handlers::volunteers::get_queue),
        )
        .route("/api/p2p/send", post(handlers::messaging::send_message))
        .route(
            "/api/p2p/conversations/{assignment_id}",
            get(handlers::messaging::get_conversation),
        )
        .route(
            "/api/p2p/assignments/{id}/complete",
            axum::routing::patch(handlers::messaging::complete_assignment),
        )
        .route(
            "/api/p2p/assignments/{id}/skip",
            axum::routing::patch(handlers::messaging::skip_assignment),
        )
        // Provider webhook + inbox
        .route("/api/incoming", post(handlers::webhook::incoming))
        .route("/api/messages", get(handlers::messages::list_messages))
        .route("/api/reply", post(handlers::messages::send_reply))
        // Bulk blast
        .route("/api/send", post(handlers::campaigns::bulk_send))
        .route(
            "/api/test-connection",
            post(handlers::campaigns::test_connection),
        )
        // Contacts
        .route(
            "/api/contacts",
            get(handlers::contacts::list_contacts)
                .post(handlers::contacts::create_contact)
                .delete(handlers::contacts::delete_all_contacts),
        )
        .route(
            "/api/contacts/import",
            post(handlers::contacts::import_contacts),
        )
        .route("/api/contacts/{id}", delete(handlers::contacts::delete_contact))
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PATCH,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any),
                ),
        )
        .layer(Extension(sms))
        .with_state((pool, config));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
