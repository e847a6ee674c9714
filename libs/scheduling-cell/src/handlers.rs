use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use notification_cell::services::dispatcher::RedisNotificationDispatcher;
use notification_cell::services::inbox::HttpInboxClient;
use notification_cell::NotificationMessage;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::scheduling::PersonRole;

use crate::models::{
    CreateAppointmentRequest, RescheduleRequest, SchedulingError, UpdateStatusRequest,
};
use crate::services::conflict::ConflictDetector;
use crate::services::reaction::{ReactionPrompt, ReactionService};
use crate::services::scheduler::SchedulingService;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_person_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub accepted: bool,
    pub notification: NotificationMessage,
}

// ==============================================================================
// WIRING HELPERS
// ==============================================================================

fn appointment_store(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    Arc::new(SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(
        config,
    ))))
}

async fn scheduling_service(config: &AppConfig) -> Result<Arc<SchedulingService>, AppError> {
    let dispatcher = RedisNotificationDispatcher::connect(config)
        .await
        .map_err(|e| {
            error!("Failed to reach notification queue: {}", e);
            AppError::ExternalService("Notification queue unavailable".to_string())
        })?;

    Ok(Arc::new(SchedulingService::new(
        appointment_store(config),
        Arc::new(dispatcher),
    )))
}

async fn reaction_service(config: &AppConfig) -> Result<ReactionService, AppError> {
    let scheduler = scheduling_service(config).await?;
    let inbox = Arc::new(HttpInboxClient::new(config));
    Ok(ReactionService::new(scheduler, inbox))
}

fn initiator_role(user: &User) -> PersonRole {
    match user.role.as_deref() {
        Some("doctor") => PersonRole::Doctor,
        Some("admin") => PersonRole::Admin,
        _ => PersonRole::Patient,
    }
}

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SchedulingError::Validation(msg) => AppError::ValidationError(msg),
        SchedulingError::Conflict => {
            AppError::Conflict("Appointment slot conflicts with an existing booking".to_string())
        }
        SchedulingError::IllegalTransition { from, to } => AppError::Conflict(format!(
            "Illegal status transition from {} to {}",
            from, to
        )),
        SchedulingError::ConcurrentModification => {
            AppError::Conflict("Appointment was modified concurrently, please retry".to_string())
        }
        SchedulingError::Database(msg) => AppError::Database(msg),
        SchedulingError::Notification(e) => AppError::ExternalService(e.to_string()),
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = scheduling_service(&state).await?;

    let appointment = service
        .create(request, initiator_role(&user), auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let store = appointment_store(&state);

    let appointment = store
        .find_by_id(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment_details(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let store = appointment_store(&state);

    let detail = store
        .find_by_id_with_details(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = scheduling_service(&state).await?;

    let appointment = service
        .update_status(appointment_id, request.status, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = scheduling_service(&state).await?;

    let appointment = service
        .reschedule(
            appointment_id,
            request.new_start_time,
            request.new_end_time,
            auth.token(),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if user.role.as_deref() != Some("admin") {
        return Err(AppError::Auth(
            "Only administrators can delete appointments".to_string(),
        ));
    }

    let store = appointment_store(&state);
    store
        .delete(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(person_id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let store = appointment_store(&state);

    let appointments = match (range.from, range.to) {
        (Some(from), Some(to)) => store
            .find_by_doctor_in_range(person_id, from, to, auth.token())
            .await,
        _ => store.find_by_doctor(person_id, auth.token()).await,
    }
    .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(person_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let store = appointment_store(&state);
    let appointments = store
        .find_by_patient(person_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_related_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(person_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let store = appointment_store(&state);
    let appointments = store
        .find_related_to_person(person_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

// ==============================================================================
// CONFLICT CHECK
// ==============================================================================

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ConflictCheckQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let detector = ConflictDetector::new(appointment_store(&state));

    let has_conflict = detector
        .has_conflict(
            query.doctor_person_id,
            query.start_time,
            query.end_time,
            query.exclude_appointment_id,
            auth.token(),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "has_conflict": has_conflict })))
}

// ==============================================================================
// REACTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn open_notification(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(notification): Json<NotificationMessage>,
) -> Result<Json<Value>, AppError> {
    let service = reaction_service(&state).await?;

    let prompt = service
        .open(notification, &user)
        .await
        .map_err(map_scheduling_error)?;

    let response = match prompt {
        ReactionPrompt::Acknowledged => json!({
            "action_required": false
        }),
        ReactionPrompt::DecisionRequired { notification } => json!({
            "action_required": true,
            "notification": notification
        }),
    };

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn decide_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<DecideRequest>,
) -> Result<Json<Value>, AppError> {
    let service = reaction_service(&state).await?;

    let appointment = service
        .decide(request.accepted, request.notification, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}
