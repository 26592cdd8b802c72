use std::sync::Arc;

use tokio::sync::watch;

use notifyhub_common::config::AppConfig;
use notifyhub_common::db;
use notifyhub_common::queue::NotificationQueue;
use notifyhub_common::redis_pool::create_redis_pool;
use notifyhub_common::shutdown::shutdown_signal;
use notifyhub_notifier::dispatch::DispatchCoordinator;
use notifyhub_notifier::registry::ChannelRegistry;
use notifyhub_notifier::status::StatusTracker;
use notifyhub_notifier::store::PgNotificationStore;
use notifyhub_worker::consumer::QueueConsumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notifyhub_worker=info,notifyhub_notifier=info".into()),
        )
        .json()
        .init();

    tracing::info!("NotifyHub worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database (tables are created by the API)
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Dedicated Redis connection: blocking reads hold it while waiting
    let redis = create_redis_pool(&config.redis_url).await?;
    let queue = NotificationQueue::new(redis, &config.queue_name);

    let registry = ChannelRegistry::from_config(&config, reqwest::Client::new());
    let tracker = StatusTracker::new(Arc::new(PgNotificationStore::new(pool.clone())));
    let coordinator =
        DispatchCoordinator::new(registry, tracker).with_send_timeout(config.send_timeout());

    let consumer = QueueConsumer::new(queue, coordinator, config.worker_poll_timeout_secs);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = consumer.run(shutdown_rx).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Consumer exited with error");
    }

    db::close_pool(&pool).await;
    tracing::info!("NotifyHub worker stopped.");
    result
}
