use std::sync::Arc;

use axum::{routing::get, Router};

use notification_cell::router::notification_routes;
use person_cell::router::person_routes;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "LifePlus scheduling API is running!" }))
        .nest("/appointments", scheduling_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/persons", person_routes(state))
}
