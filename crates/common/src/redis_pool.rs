use redis::Client;
use redis::aio::ConnectionManager;

/// Create a Redis connection manager for async operations.
///
/// The worker's blocking queue reads hold the multiplexed connection, so each
/// consumer should own a dedicated manager rather than share one with other callers.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}
