use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::scheduling::AppointmentStatus;

/// Urgency of a notification: action-required messages prompt the receiver
/// for an accept/reject decision, info messages are purely informational.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationUrgency {
    ActionRequired,
    Info,
}

/// The unsent notification shape. This is also the exact queue message
/// published to the notification topic, so the wire casing is fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub appointment_id: i64,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub notification_status: NotificationUrgency,
}

/// A stored notification as returned by the remote notification service.
/// The id is assigned remotely; `appointment_id` is a weak back-reference
/// and may no longer resolve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub appointment_id: i64,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub notification_status: NotificationUrgency,
    pub created_at: DateTime<Utc>,
}

/// Everything the composer needs to know about an appointment transition.
/// Kept free of scheduling-cell types so the dependency points one way.
#[derive(Debug, Clone)]
pub struct NoticeContext {
    pub appointment_id: i64,
    pub status: AppointmentStatus,
    pub patient_person_id: i64,
    pub doctor_person_id: i64,
    pub patient_display_name: String,
}

/// Resolved sender/receiver pair for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audience {
    pub sender_id: i64,
    pub receiver_id: i64,
}
