pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::NotificationError;
pub use models::{
    Audience, NotificationDraft, NotificationMessage, NotificationUrgency, NoticeContext,
};
pub use router::notification_routes;
pub use services::composer::{compose, resolve_audience};
pub use services::dispatcher::{NotificationDispatcher, RedisNotificationDispatcher};
pub use services::inbox::{
    count_unread_best_effort, list_best_effort, HttpInboxClient, InboxClient,
};
