use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notification_cell::NotificationError;
use person_cell::Person;
use shared_models::scheduling::AppointmentStatus;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A persisted appointment row. The interval is half-open: `[start_time,
/// end_time)`, so back-to-back slots share a boundary without overlapping.
/// `version` backs the optimistic-concurrency check on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub doctor_person_id: i64,
    pub patient_person_id: Option<i64>,
    pub external_patient_name: Option<String>,
    pub external_patient_phone: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An appointment that has not been persisted yet; ids, version and
/// timestamps are assigned by the store on insert.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDraft {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub doctor_person_id: i64,
    pub patient_person_id: Option<i64>,
    pub external_patient_name: Option<String>,
    pub external_patient_phone: Option<String>,
}

/// Eager-loaded variant with the doctor and patient parties resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<Person>,
    pub patient: Option<Person>,
}

impl AppointmentDetail {
    /// Name of the booked party: a registered person, or the external
    /// contact the doctor typed in, or a placeholder.
    pub fn patient_display_name(&self) -> String {
        if let Some(patient) = &self.patient {
            return patient.display_name();
        }
        self.appointment
            .external_patient_name
            .clone()
            .unwrap_or_else(|| "Unknown patient".to_string())
    }
}

// ==============================================================================
// CONFLICT POLICY
// ==============================================================================

/// Which statuses are ignored by the conflict search. The default frees
/// slots held by cancelled and no-show appointments so they can be
/// rebooked; `including_terminal` restores the stricter behavior where
/// any historical row still blocks its slot.
#[derive(Debug, Clone)]
pub struct ConflictPolicy {
    pub excluded_statuses: Vec<AppointmentStatus>,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            excluded_statuses: vec![AppointmentStatus::Cancelled, AppointmentStatus::NoShow],
        }
    }
}

impl ConflictPolicy {
    pub fn including_terminal() -> Self {
        Self {
            excluded_statuses: Vec::new(),
        }
    }

    pub fn blocks(&self, status: AppointmentStatus) -> bool {
        !self.excluded_statuses.contains(&status)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub doctor_person_id: i64,
    pub patient_person_id: Option<i64>,
    pub external_patient_name: Option<String>,
    pub external_patient_phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_end_time: DateTime<Utc>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment conflicts with an existing booking")]
    Conflict,

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified concurrently")]
    ConcurrentModification,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Notification pipeline error: {0}")]
    Notification(#[from] NotificationError),
}
