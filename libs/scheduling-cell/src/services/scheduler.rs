use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use notification_cell::services::composer::compose;
use notification_cell::services::dispatcher::NotificationDispatcher;
use notification_cell::{NotificationMessage, NoticeContext};
use shared_models::scheduling::{AppointmentStatus, PersonRole};

use crate::models::{
    Appointment, AppointmentDraft, ConflictPolicy, CreateAppointmentRequest, SchedulingError,
};
use crate::services::conflict::ConflictDetector;
use crate::services::lifecycle::ensure_legal;
use crate::services::store::AppointmentStore;

/// Owns the appointment state machine. Every transition is validated,
/// persisted and then mirrored to the notification pipeline; the store,
/// detector and dispatcher are injected rather than looked up.
pub struct SchedulingService {
    store: Arc<dyn AppointmentStore>,
    detector: ConflictDetector,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl SchedulingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let detector = ConflictDetector::new(Arc::clone(&store));
        Self {
            store,
            detector,
            dispatcher,
        }
    }

    pub fn with_policy(
        store: Arc<dyn AppointmentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        policy: ConflictPolicy,
    ) -> Self {
        let detector = ConflictDetector::with_policy(Arc::clone(&store), policy);
        Self {
            store,
            detector,
            dispatcher,
        }
    }

    /// A patient asking for a doctor's time opens a request; a doctor or
    /// administrator booking directly lands straight in `Scheduled`. Only
    /// the request flow notifies (the doctor must accept or reject).
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        initiator: PersonRole,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let status = match initiator {
            PersonRole::Patient => AppointmentStatus::RequestPending,
            PersonRole::Doctor | PersonRole::Admin => AppointmentStatus::Scheduled,
        };

        let draft = AppointmentDraft {
            start_time: request.start_time,
            end_time: request.end_time,
            title: request.title,
            description: request.description,
            status,
            doctor_person_id: request.doctor_person_id,
            patient_person_id: request.patient_person_id,
            external_patient_name: request.external_patient_name,
            external_patient_phone: request.external_patient_phone,
        };

        self.detector.validate(&draft, None, auth_token).await?;
        let appointment = self.store.insert(&draft, auth_token).await?;

        // The validate-then-insert window is not locked; re-check against
        // the committed row and back out if a concurrent insert won.
        if self
            .detector
            .has_conflict(
                appointment.doctor_person_id,
                appointment.start_time,
                appointment.end_time,
                Some(appointment.id),
                auth_token,
            )
            .await?
        {
            warn!(
                "Concurrent booking beat appointment {}; rolling back",
                appointment.id
            );
            self.store.delete(appointment.id, auth_token).await?;
            return Err(SchedulingError::Conflict);
        }

        info!(
            "Appointment {} created with status {} for doctor {}",
            appointment.id, appointment.status, appointment.doctor_person_id
        );

        if appointment.status == AppointmentStatus::RequestPending {
            self.notify(&appointment, auth_token).await;
        }

        Ok(appointment)
    }

    /// General-purpose administrative transition. Always notifies, even
    /// when the target status equals the current one.
    pub async fn update_status(
        &self,
        appointment_id: i64,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self
            .store
            .find_by_id(appointment_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFound)?;

        ensure_legal(appointment.status, new_status)?;

        appointment.status = new_status;
        let saved = self.store.update(&appointment, auth_token).await?;

        info!("Appointment {} moved to {}", saved.id, saved.status);
        self.notify(&saved, auth_token).await;

        Ok(saved)
    }

    /// Timing change outside the state machine. Re-validates against the
    /// doctor's calendar with the appointment's own id excluded.
    pub async fn reschedule(
        &self,
        appointment_id: i64,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self
            .store
            .find_by_id(appointment_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFound)?;

        let draft = AppointmentDraft {
            start_time: new_start,
            end_time: new_end,
            title: appointment.title.clone(),
            description: appointment.description.clone(),
            status: appointment.status,
            doctor_person_id: appointment.doctor_person_id,
            patient_person_id: appointment.patient_person_id,
            external_patient_name: appointment.external_patient_name.clone(),
            external_patient_phone: appointment.external_patient_phone.clone(),
        };
        self.detector
            .validate(&draft, Some(appointment_id), auth_token)
            .await?;

        appointment.start_time = new_start;
        appointment.end_time = new_end;
        self.store.update(&appointment, auth_token).await
    }

    /// Resolve the appointment behind an action-required notification and
    /// apply the receiver's decision. Returns `None` when the appointment
    /// is gone (the caller must not touch the notification in that case).
    pub async fn accept_schedule(
        &self,
        accepted: bool,
        notification: &NotificationMessage,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let Some(mut appointment) = self
            .store
            .find_by_id(notification.appointment_id, auth_token)
            .await?
        else {
            debug!(
                "Notification {} references missing appointment {}",
                notification.id, notification.appointment_id
            );
            return Ok(None);
        };

        let target = if accepted {
            AppointmentStatus::Scheduled
        } else {
            AppointmentStatus::Cancelled
        };
        ensure_legal(appointment.status, target)?;

        appointment.status = target;
        let saved = self.store.update(&appointment, auth_token).await?;

        info!(
            "Scheduling request for appointment {} {}",
            saved.id,
            if accepted { "accepted" } else { "rejected" }
        );
        self.notify(&saved, auth_token).await;

        Ok(Some(saved))
    }

    /// Administrative removal; bypasses the state machine and the notify
    /// path entirely.
    pub async fn delete(&self, appointment_id: i64, auth_token: &str) -> Result<(), SchedulingError> {
        self.store.delete(appointment_id, auth_token).await
    }

    // The committed state change and the notification are not linked
    // transactionally: a dispatch failure is logged and swallowed.
    async fn notify(&self, appointment: &Appointment, auth_token: &str) {
        match self.build_context(appointment, auth_token).await {
            Ok(Some(ctx)) => {
                let draft = compose(&ctx);
                if let Err(e) = self.dispatcher.dispatch(&draft).await {
                    warn!(
                        "Notification dispatch failed for appointment {}: {}",
                        appointment.id, e
                    );
                }
            }
            Ok(None) => debug!(
                "No registered patient party on appointment {}; skipping notification",
                appointment.id
            ),
            Err(e) => warn!(
                "Could not assemble notification for appointment {}: {}",
                appointment.id, e
            ),
        }
    }

    async fn build_context(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Option<NoticeContext>, SchedulingError> {
        // Unregistered external patients have no person id to send as
        let Some(patient_person_id) = appointment.patient_person_id else {
            return Ok(None);
        };

        let detail = self
            .store
            .find_by_id_with_details(appointment.id, auth_token)
            .await?;

        let patient_display_name = detail
            .as_ref()
            .map(|d| d.patient_display_name())
            .unwrap_or_else(|| "A patient".to_string());

        Ok(Some(NoticeContext {
            appointment_id: appointment.id,
            status: appointment.status,
            patient_person_id,
            doctor_person_id: appointment.doctor_person_id,
            patient_display_name,
        }))
    }
}
