use async_trait::async_trait;
use chrono::Duration;
use reqwest::{header::AUTHORIZATION, Client, Method};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_utils::jwt::mint_token;

use crate::error::NotificationError;
use crate::models::NotificationMessage;

const CALL_TIMEOUT_SECONDS: u64 = 5;
const TOKEN_TTL_MINUTES: i64 = 5;

/// Synchronous client against the remote notification store. Errors are
/// surfaced as `NotificationError`; the fail-soft contract for the read
/// path lives in the `*_best_effort` adapters below, not in here.
#[async_trait]
pub trait InboxClient: Send + Sync {
    async fn list_by_receiver(
        &self,
        principal: &User,
        receiver_id: i64,
    ) -> Result<Vec<NotificationMessage>, NotificationError>;

    async fn count_unread(
        &self,
        principal: &User,
        receiver_id: i64,
    ) -> Result<i64, NotificationError>;

    /// Idempotent upsert by notification id.
    async fn update(
        &self,
        principal: &User,
        notification: &NotificationMessage,
    ) -> Result<(), NotificationError>;

    /// Upsert with the read flag set.
    async fn mark_read(
        &self,
        principal: &User,
        notification: &NotificationMessage,
    ) -> Result<(), NotificationError> {
        let mut read = notification.clone();
        read.read = true;
        self.update(principal, &read).await
    }
}

pub struct HttpInboxClient {
    http: Client,
    base_url: String,
    jwt_secret: String,
}

impl HttpInboxClient {
    pub fn new(config: &AppConfig) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(CALL_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: config.notification_service_url.trim_end_matches('/').to_string(),
            jwt_secret: config.supabase_jwt_secret.clone(),
        }
    }

    // A fresh credential per outbound call, minted from the calling
    // principal. Never cached across calls.
    fn bearer(&self, principal: &User) -> Result<String, NotificationError> {
        let token = mint_token(principal, &self.jwt_secret, Duration::minutes(TOKEN_TTL_MINUTES))
            .map_err(NotificationError::Credential)?;
        Ok(format!("Bearer {}", token))
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        principal: &User,
        body: Option<&NotificationMessage>,
    ) -> Result<reqwest::Response, NotificationError> {
        debug!("Inbox client call: {} {}", method, url);

        let mut req = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, self.bearer(principal)?);

        if let Some(message) = body {
            req = req.json(message);
        }

        let response = req
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl InboxClient for HttpInboxClient {
    async fn list_by_receiver(
        &self,
        principal: &User,
        receiver_id: i64,
    ) -> Result<Vec<NotificationMessage>, NotificationError> {
        let url = format!("{}/notifications?userId={}", self.base_url, receiver_id);
        let response = self.send(Method::GET, url, principal, None).await?;

        response
            .json::<Vec<NotificationMessage>>()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))
    }

    async fn count_unread(
        &self,
        principal: &User,
        receiver_id: i64,
    ) -> Result<i64, NotificationError> {
        let url = format!("{}/notifications/count?userId={}", self.base_url, receiver_id);
        let response = self.send(Method::GET, url, principal, None).await?;

        response
            .json::<i64>()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))
    }

    async fn update(
        &self,
        principal: &User,
        notification: &NotificationMessage,
    ) -> Result<(), NotificationError> {
        let url = format!("{}/notifications/{}", self.base_url, notification.id);
        self.send(Method::PUT, url, principal, Some(notification))
            .await?;
        Ok(())
    }
}

/// Notification visibility is best-effort and must never block scheduling
/// flows: a failed list degrades to an empty inbox.
pub async fn list_best_effort(
    client: &dyn InboxClient,
    principal: &User,
    receiver_id: i64,
) -> Vec<NotificationMessage> {
    match client.list_by_receiver(principal, receiver_id).await {
        Ok(notifications) => notifications,
        Err(e) => {
            warn!("Inbox list degraded to empty: {}", e);
            Vec::new()
        }
    }
}

/// A failed unread count degrades to zero.
pub async fn count_unread_best_effort(
    client: &dyn InboxClient,
    principal: &User,
    receiver_id: i64,
) -> i64 {
    match client.count_unread(principal, receiver_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Inbox count degraded to zero: {}", e);
            0
        }
    }
}
