use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::NotificationDraft;

/// Durable topic the producer owns. Pushing to a Redis list creates it on
/// first use, which doubles as the create-if-absent topic declaration.
pub const NOTIFICATION_QUEUE_KEY: &str = "notification-queue";

/// Publishes composed notification drafts to the durable queue. Success
/// means the broker accepted the message, nothing more; delivery to the
/// remote notification store is asynchronous and at-least-once.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, draft: &NotificationDraft) -> Result<(), NotificationError>;
}

pub struct RedisNotificationDispatcher {
    pool: Pool,
    max_attempts: u32,
}

impl RedisNotificationDispatcher {
    pub async fn connect(config: &AppConfig) -> Result<Self, NotificationError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| NotificationError::Publish(format!("Failed to create Redis pool: {}", e)))?;

        // Probe the connection up front so misconfiguration fails loudly
        let mut conn = pool
            .get()
            .await
            .map_err(|e| NotificationError::Publish(format!("Failed to connect to Redis: {}", e)))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| NotificationError::Publish(e.to_string()))?;

        info!("Notification dispatcher connected to queue");

        Ok(Self {
            pool,
            max_attempts: 3,
        })
    }

    async fn publish_once(&self, payload: &str) -> Result<(), NotificationError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| NotificationError::Publish(e.to_string()))?;

        let _: () = conn
            .lpush(NOTIFICATION_QUEUE_KEY, payload)
            .await
            .map_err(|e| NotificationError::Publish(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for RedisNotificationDispatcher {
    async fn dispatch(&self, draft: &NotificationDraft) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(draft)?;

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match self.publish_once(&payload).await {
                Ok(()) => {
                    debug!(
                        "Notification for appointment {} published to {}",
                        draft.appointment_id, NOTIFICATION_QUEUE_KEY
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Publish attempt {}/{} failed: {}",
                        attempt, self.max_attempts, e
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(tokio::time::Duration::from_millis(
                            100 * attempt as u64,
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| NotificationError::Publish("queue unreachable".to_string())))
    }
}
