use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    // Every scheduling operation requires authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/{appointment_id}/details", get(handlers::get_appointment_details))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))

        // Listings
        .route("/doctors/{person_id}", get(handlers::get_doctor_appointments))
        .route("/patients/{person_id}", get(handlers::get_patient_appointments))
        .route("/related/{person_id}", get(handlers::get_related_appointments))

        // Utilities
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))

        // Notification reactions
        .route("/reactions/open", post(handlers::open_notification))
        .route("/reactions/decide", post(handlers::decide_notification))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
