use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use shared_database::supabase::SupabaseClient;
use shared_models::scheduling::AppointmentStatus;

use crate::models::{Appointment, AppointmentDetail, AppointmentDraft, ConflictPolicy, SchedulingError};

const DETAIL_SELECT: &str =
    "select=*,doctor:persons!doctor_person_id(*),patient:persons!patient_person_id(*)";

/// Persistence facade for appointments. Reads may be served from a
/// replica; writes always hit the primary.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(
        &self,
        draft: &AppointmentDraft,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    /// Version-guarded update. A concurrent writer bumps the version first
    /// and this call then matches zero rows, which surfaces as
    /// `ConcurrentModification` instead of a silent lost update.
    async fn update(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    async fn find_by_id(
        &self,
        id: i64,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError>;

    async fn find_by_id_with_details(
        &self,
        id: i64,
        auth_token: &str,
    ) -> Result<Option<AppointmentDetail>, SchedulingError>;

    async fn find_by_doctor(
        &self,
        doctor_person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn find_by_patient(
        &self,
        person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Union over both roles, de-duplicated, ordered by start time.
    async fn find_related_to_person(
        &self,
        person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn find_by_doctor_in_range(
        &self,
        doctor_person_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Every appointment of the doctor, other than `exclude_id`, whose
    /// interval overlaps `[start, end)`, minus the statuses the policy
    /// excludes.
    async fn find_conflicting(
        &self,
        doctor_person_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
        policy: &ConflictPolicy,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Administrative hard delete; cancellation is a status transition
    /// and never comes through here.
    async fn delete(&self, id: i64, auth_token: &str) -> Result<(), SchedulingError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }

    fn encode_ts(ts: DateTime<Utc>) -> String {
        urlencoding::encode(&ts.to_rfc3339()).into_owned()
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, SchedulingError> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| SchedulingError::Database(format!("Failed to parse appointment: {}", e)))
            })
            .collect()
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, SchedulingError> {
        let rows: Vec<Value> = self
            .supabase
            .request_read(path, Some(auth_token))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        Self::parse_rows(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(
        &self,
        draft: &AppointmentDraft,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Inserting appointment for doctor {} at {}",
            draft.doctor_person_id, draft.start_time
        );

        let body = serde_json::to_value(draft)
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Updating appointment {} (version {})",
            appointment.id, appointment.version
        );

        let body = json!({
            "start_time": appointment.start_time,
            "end_time": appointment.end_time,
            "title": appointment.title,
            "description": appointment.description,
            "status": appointment.status,
            "patient_person_id": appointment.patient_person_id,
            "external_patient_name": appointment.external_patient_name,
            "external_patient_phone": appointment.external_patient_phone,
            "version": appointment.version + 1,
            "updated_at": Utc::now(),
        });

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&version=eq.{}",
            appointment.id, appointment.version
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or(SchedulingError::ConcurrentModification)
    }

    async fn find_by_id(
        &self,
        id: i64,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        Ok(self.fetch(&path, auth_token).await?.into_iter().next())
    }

    async fn find_by_id_with_details(
        &self,
        id: i64,
        auth_token: &str,
    ) -> Result<Option<AppointmentDetail>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&{}", id, DETAIL_SELECT);
        let rows: Vec<Value> = self
            .supabase
            .request_read(&path, Some(auth_token))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| SchedulingError::Database(format!("Failed to parse appointment: {}", e))),
            None => Ok(None),
        }
    }

    async fn find_by_doctor(
        &self,
        doctor_person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_person_id=eq.{}&order=start_time.asc",
            doctor_person_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn find_by_patient(
        &self,
        person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_person_id=eq.{}&order=start_time.asc",
            person_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn find_related_to_person(
        &self,
        person_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        // Single or= query: the union arrives de-duplicated by construction
        let path = format!(
            "/rest/v1/appointments?or=(doctor_person_id.eq.{},patient_person_id.eq.{})&order=start_time.asc",
            person_id, person_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn find_by_doctor_in_range(
        &self,
        doctor_person_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_person_id=eq.{}&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            doctor_person_id,
            Self::encode_ts(from),
            Self::encode_ts(to)
        );
        self.fetch(&path, auth_token).await
    }

    async fn find_conflicting(
        &self,
        doctor_person_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
        policy: &ConflictPolicy,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        // Half-open overlap: existing.start < end AND existing.end > start
        let mut query_parts = vec![
            format!("doctor_person_id=eq.{}", doctor_person_id),
            format!("start_time=lt.{}", Self::encode_ts(end)),
            format!("end_time=gt.{}", Self::encode_ts(start)),
        ];

        if let Some(exclude) = exclude_id {
            query_parts.push(format!("id=neq.{}", exclude));
        }

        if !policy.excluded_statuses.is_empty() {
            let excluded = policy
                .excluded_statuses
                .iter()
                .map(AppointmentStatus::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query_parts.push(format!("status=not.in.({})", excluded));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );
        self.fetch(&path, auth_token).await
    }

    async fn delete(&self, id: i64, auth_token: &str) -> Result<(), SchedulingError> {
        debug!("Deleting appointment {}", id);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(())
    }
}
