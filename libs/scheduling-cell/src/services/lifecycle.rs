use tracing::warn;

use shared_models::scheduling::AppointmentStatus;

use crate::models::SchedulingError;

/// All legal next statuses for a given current status. Terminal statuses
/// have no outgoing edges.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    match current {
        AppointmentStatus::RequestPending => {
            &[AppointmentStatus::Scheduled, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Scheduled => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Confirmed => &[
            AppointmentStatus::InProgress,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::InProgress => {
            &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow => &[],
    }
}

/// Re-applying the current status is a no-op and stays legal, which keeps
/// `update_status` idempotent in its stored effect.
pub fn ensure_legal(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), SchedulingError> {
    if from == to || valid_transitions(from).contains(&to) {
        return Ok(());
    }

    warn!("Illegal status transition attempted: {} -> {}", from, to);
    Err(SchedulingError::IllegalTransition { from, to })
}
