use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::scheduling::PersonRole;

use crate::models::{CreatePersonRequest, PersonError, UpdatePersonRequest};
use crate::services::person::PersonService;

#[derive(Debug, Deserialize)]
pub struct PersonListQuery {
    pub role: PersonRole,
}

fn map_person_error(e: PersonError) -> AppError {
    match e {
        PersonError::NotFound => AppError::NotFound("Person not found".to_string()),
        PersonError::Validation(msg) => AppError::ValidationError(msg),
        PersonError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_person(
    State(state): State<Arc<AppConfig>>,
    Path(person_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = PersonService::new(&state);
    let person = service
        .get_person(person_id, auth.token())
        .await
        .map_err(map_person_error)?;

    Ok(Json(json!(person)))
}

#[axum::debug_handler]
pub async fn list_persons(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PersonListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = PersonService::new(&state);
    let persons = service
        .list_by_role(query.role, auth.token())
        .await
        .map_err(map_person_error)?;

    Ok(Json(json!({ "persons": persons })))
}

#[axum::debug_handler]
pub async fn create_person(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreatePersonRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PersonService::new(&state);
    let person = service
        .create_person(request, auth.token())
        .await
        .map_err(map_person_error)?;

    Ok(Json(json!({
        "success": true,
        "person": person
    })))
}

#[axum::debug_handler]
pub async fn update_person(
    State(state): State<Arc<AppConfig>>,
    Path(person_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdatePersonRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PersonService::new(&state);
    let person = service
        .update_person(person_id, request, auth.token())
        .await
        .map_err(map_person_error)?;

    Ok(Json(json!({
        "success": true,
        "person": person
    })))
}
