use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::{error, info};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::NotificationDraft;
use crate::services::dispatcher::{NotificationDispatcher, RedisNotificationDispatcher};
use crate::services::inbox::{count_unread_best_effort, list_best_effort, HttpInboxClient};

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub user_id: i64,
}

/// Front door for the queue producer: accepts a draft, hands it to the
/// broker, answers 202. Acceptance only means the broker has it.
#[axum::debug_handler]
pub async fn publish_notification(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(draft): Json<NotificationDraft>,
) -> Result<(StatusCode, String), AppError> {
    info!(
        "Publishing notification for appointment {} from user {}",
        draft.appointment_id, user.id
    );

    let dispatcher = RedisNotificationDispatcher::connect(&config)
        .await
        .map_err(|e| {
            error!("Failed to reach notification queue: {}", e);
            AppError::ExternalService("Notification queue unavailable".to_string())
        })?;

    dispatcher.dispatch(&draft).await.map_err(|e| {
        error!("Failed to publish notification: {}", e);
        AppError::ExternalService("Notification publish failed".to_string())
    })?;

    Ok((
        StatusCode::ACCEPTED,
        "Notification accepted for delivery".to_string(),
    ))
}

/// Inbox listing for the bell menu. Degrades to an empty list on remote
/// failure instead of surfacing an error to the presentation layer.
#[axum::debug_handler]
pub async fn get_inbox(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<InboxQuery>,
) -> Json<serde_json::Value> {
    let client = HttpInboxClient::new(&config);
    let notifications = list_best_effort(&client, &user, query.user_id).await;

    Json(serde_json::json!({
        "notifications": notifications
    }))
}

/// Unread badge count. Degrades to zero on remote failure.
#[axum::debug_handler]
pub async fn get_inbox_count(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<InboxQuery>,
) -> Json<serde_json::Value> {
    let client = HttpInboxClient::new(&config);
    let count = count_unread_best_effort(&client, &user, query.user_id).await;

    Json(serde_json::json!({
        "count": count
    }))
}
