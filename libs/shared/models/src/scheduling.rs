use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an appointment. Transition rules live in the
/// scheduling cell; this enum only carries identity and wire format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    RequestPending,
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal statuses soft-retire the appointment; nothing transitions
    /// out of them in normal operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::RequestPending => write!(f, "request_pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// Presentation metadata for a status, kept apart from transition logic so
/// the two can change (and be tested) independently.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub badge_color: &'static str,
}

pub fn status_display(status: AppointmentStatus) -> StatusDisplay {
    match status {
        AppointmentStatus::RequestPending => StatusDisplay {
            label: "Requested",
            badge_color: "contrast",
        },
        AppointmentStatus::Scheduled => StatusDisplay {
            label: "Scheduled",
            badge_color: "primary",
        },
        AppointmentStatus::Confirmed => StatusDisplay {
            label: "Confirmed",
            badge_color: "success",
        },
        AppointmentStatus::InProgress => StatusDisplay {
            label: "In progress",
            badge_color: "primary",
        },
        AppointmentStatus::Completed => StatusDisplay {
            label: "Completed",
            badge_color: "success",
        },
        AppointmentStatus::Cancelled => StatusDisplay {
            label: "Cancelled",
            badge_color: "error",
        },
        AppointmentStatus::NoShow => StatusDisplay {
            label: "No-show",
            badge_color: "error",
        },
    }
}

/// Role a person plays in the clinic. Selects which role extension a
/// Person record may carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonRole::Patient => write!(f, "patient"),
            PersonRole::Doctor => write!(f, "doctor"),
            PersonRole::Admin => write!(f, "admin"),
        }
    }
}
