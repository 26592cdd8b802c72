//! NotifyHub API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use notifyhub_common::config::AppConfig;
use notifyhub_common::db::{close_pool, create_pool};
use notifyhub_common::queue::NotificationQueue;
use notifyhub_common::redis_pool::create_redis_pool;
use notifyhub_common::shutdown::shutdown_signal;
use notifyhub_notifier::store::PgNotificationStore;

use notifyhub_api::routes::create_router;
use notifyhub_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("notifyhub_api=debug,notifyhub_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting NotifyHub API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool; only the API applies migrations
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Create Redis connection for the queue producer
    let redis = create_redis_pool(&config.redis_url).await?;
    let queue = NotificationQueue::new(redis, &config.queue_name);
    tracing::info!(queue = %queue.queue_key(), "Queue publisher ready");

    // Build application state
    let state = AppState::new(
        Arc::new(PgNotificationStore::new(pool.clone())),
        Arc::new(queue),
    );

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .api_bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("API_BIND_ADDR is not a valid socket address: {}", e))?;
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(&pool).await;
    tracing::info!("NotifyHub API server stopped.");
    Ok(())
}
