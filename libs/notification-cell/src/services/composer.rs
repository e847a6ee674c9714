use shared_models::scheduling::AppointmentStatus;

use crate::models::{Audience, NotificationDraft, NoticeContext, NotificationUrgency};

/// The single place the sender/receiver decision lives. Current rule:
/// every transition notice is sent by the patient party and addressed to
/// the doctor party, including transitions the doctor caused. Changing the
/// audience policy means changing exactly this function.
pub fn resolve_audience(ctx: &NoticeContext) -> Audience {
    Audience {
        sender_id: ctx.patient_person_id,
        receiver_id: ctx.doctor_person_id,
    }
}

/// Map an appointment transition to a notification draft. Total over the
/// status enum; every draft starts unread.
pub fn compose(ctx: &NoticeContext) -> NotificationDraft {
    let audience = resolve_audience(ctx);

    let (title, urgency, message) = match ctx.status {
        AppointmentStatus::RequestPending => (
            "Scheduling request",
            NotificationUrgency::ActionRequired,
            format!(
                "{} requested an appointment with you",
                ctx.patient_display_name
            ),
        ),
        AppointmentStatus::Scheduled => (
            "Appointment confirmed",
            NotificationUrgency::Info,
            format!(
                "Appointment #{} was successfully scheduled",
                ctx.appointment_id
            ),
        ),
        AppointmentStatus::Confirmed => (
            "Appointment confirmation",
            NotificationUrgency::Info,
            format!("Appointment #{} was confirmed", ctx.appointment_id),
        ),
        AppointmentStatus::InProgress => (
            "Appointment started",
            NotificationUrgency::Info,
            format!("Appointment #{} is now in progress", ctx.appointment_id),
        ),
        AppointmentStatus::Completed => (
            "Appointment completed",
            NotificationUrgency::Info,
            format!("Appointment #{} was completed", ctx.appointment_id),
        ),
        AppointmentStatus::Cancelled => (
            "Appointment cancelled",
            NotificationUrgency::Info,
            format!("Appointment #{} was cancelled", ctx.appointment_id),
        ),
        AppointmentStatus::NoShow => (
            "Missed appointment",
            NotificationUrgency::Info,
            format!(
                "Appointment #{} was marked as a no-show",
                ctx.appointment_id
            ),
        ),
    };

    NotificationDraft {
        sender_id: audience.sender_id,
        receiver_id: audience.receiver_id,
        appointment_id: ctx.appointment_id,
        title: title.to_string(),
        message,
        read: false,
        notification_status: urgency,
    }
}
