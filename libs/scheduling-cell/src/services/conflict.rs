use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{AppointmentDraft, ConflictPolicy, SchedulingError};
use crate::services::store::AppointmentStore;

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start,
/// b_end)`. Touching intervals (`a_end == b_start`) do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub struct ConflictDetector {
    store: Arc<dyn AppointmentStore>,
    policy: ConflictPolicy,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            store,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_policy(store: Arc<dyn AppointmentStore>, policy: ConflictPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn has_conflict(
        &self,
        doctor_person_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        debug!(
            "Checking conflicts for doctor {} from {} to {}",
            doctor_person_id, start, end
        );

        let candidates = self
            .store
            .find_conflicting(doctor_person_id, start, end, exclude_id, &self.policy, auth_token)
            .await?;

        // The store query already filters on the interval; re-apply the
        // precise overlap test and the policy locally so a looser store
        // implementation cannot widen the result.
        let conflicting: Vec<_> = candidates
            .into_iter()
            .filter(|apt| {
                intervals_overlap(apt.start_time, apt.end_time, start, end)
                    && self.policy.blocks(apt.status)
            })
            .collect();

        if !conflicting.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} overlapping appointments",
                doctor_person_id,
                conflicting.len()
            );
        }

        Ok(!conflicting.is_empty())
    }

    /// Runs immediately before every save that changes timing or doctor.
    /// `exclude_id` is the appointment's own id for edits so a reschedule
    /// does not conflict with itself.
    pub async fn validate(
        &self,
        draft: &AppointmentDraft,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        if draft.start_time >= draft.end_time {
            return Err(SchedulingError::Validation(
                "Appointment start must be before its end".to_string(),
            ));
        }
        if draft.doctor_person_id <= 0 {
            return Err(SchedulingError::Validation(
                "A doctor is required".to_string(),
            ));
        }

        let has_registered_patient = draft.patient_person_id.is_some();
        let has_external_patient = draft
            .external_patient_name
            .as_deref()
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false);
        if !has_registered_patient && !has_external_patient {
            return Err(SchedulingError::Validation(
                "A patient party is required".to_string(),
            ));
        }

        if self
            .has_conflict(
                draft.doctor_person_id,
                draft.start_time,
                draft.end_time,
                exclude_id,
                auth_token,
            )
            .await?
        {
            return Err(SchedulingError::Conflict);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn overlapping_intervals_conflict() {
        assert!(intervals_overlap(at(9, 0), at(10, 0), at(9, 30), at(10, 30)));
        assert!(intervals_overlap(at(9, 30), at(10, 30), at(9, 0), at(10, 0)));
        // Containment in both directions
        assert!(intervals_overlap(at(9, 0), at(11, 0), at(9, 30), at(10, 0)));
        assert!(intervals_overlap(at(9, 30), at(10, 0), at(9, 0), at(11, 0)));
        // Identical intervals
        assert!(intervals_overlap(at(9, 0), at(10, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        assert!(!intervals_overlap(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
        assert!(!intervals_overlap(at(10, 0), at(11, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn disjoint_intervals_do_not_conflict() {
        assert!(!intervals_overlap(at(8, 0), at(9, 0), at(14, 0), at(15, 0)));
        assert!(!intervals_overlap(at(14, 0), at(15, 0), at(8, 0), at(9, 0)));
    }
}
