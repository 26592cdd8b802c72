//! Integration tests for the Redis-backed queue.
//!
//! Requires a running Redis server. Run with:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p notifyhub-worker --test queue -- --ignored --nocapture
//! ```

use std::time::Duration;

use notifyhub_common::queue::{NotificationPublisher, NotificationQueue};
use notifyhub_common::redis_pool::create_redis_pool;
use notifyhub_common::types::{NotificationRequest, new_notification_id};

async fn fresh_queue() -> NotificationQueue {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let redis = create_redis_pool(&url).await.unwrap();
    // Unique name per test so parallel runs never share lists
    NotificationQueue::new(redis, &format!("notifyhub_test_{}", new_notification_id()))
}

fn request(message: &str) -> NotificationRequest {
    NotificationRequest {
        id: new_notification_id(),
        recipient: "user-1".to_string(),
        message: message.to_string(),
        channels: vec!["email".to_string()],
    }
}

#[tokio::test]
#[ignore]
async fn test_publish_receive_ack_is_fifo() {
    let queue = fresh_queue().await;
    let first = request("first");
    let second = request("second");

    queue.publish(&first).await.unwrap();
    queue.publish(&second).await.unwrap();
    assert_eq!(queue.depth().await.unwrap(), 2);

    let delivery = queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(delivery.decode().unwrap(), first);
    queue.ack(&delivery).await.unwrap();

    let delivery = queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(delivery.decode().unwrap(), second);
    queue.ack(&delivery).await.unwrap();

    assert!(queue.receive(Duration::from_secs(1)).await.unwrap().is_none());
    assert_eq!(queue.recover_unacked().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_unacked_messages_are_redelivered() {
    let queue = fresh_queue().await;
    let first = request("first");
    let second = request("second");
    queue.publish(&first).await.unwrap();
    queue.publish(&second).await.unwrap();

    // Simulate a consumer that crashed after receiving both messages
    queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(queue.depth().await.unwrap(), 0);

    assert_eq!(queue.recover_unacked().await.unwrap(), 2);

    let redelivered = queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(redelivered.decode().unwrap(), first);
    queue.ack(&redelivered).await.unwrap();

    let redelivered = queue.receive(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(redelivered.decode().unwrap(), second);
    queue.ack(&redelivered).await.unwrap();
}
