use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::scheduling::PersonRole;

use crate::models::{
    validate_role_extensions, CreatePersonRequest, Person, PersonError, UpdatePersonRequest,
};

const PERSON_SELECT: &str =
    "select=*,doctor_profile:doctor_profiles(*),patient_profile:patient_profiles(*)";

pub struct PersonService {
    supabase: SupabaseClient,
}

impl PersonService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }

    pub async fn get_person(&self, person_id: i64, auth_token: &str) -> Result<Person, PersonError> {
        debug!("Fetching person {}", person_id);

        let path = format!("/rest/v1/persons?id=eq.{}&{}", person_id, PERSON_SELECT);
        let result: Vec<Value> = self
            .supabase
            .request_read(&path, Some(auth_token))
            .await
            .map_err(|e| PersonError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PersonError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PersonError::Database(e.to_string()))
    }

    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Person>, PersonError> {
        debug!("Fetching person for user {}", user_id);

        let path = format!("/rest/v1/persons?user_id=eq.{}&{}", user_id, PERSON_SELECT);
        let result: Vec<Value> = self
            .supabase
            .request_read(&path, Some(auth_token))
            .await
            .map_err(|e| PersonError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| PersonError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn list_by_role(
        &self,
        role: PersonRole,
        auth_token: &str,
    ) -> Result<Vec<Person>, PersonError> {
        debug!("Listing persons with role {}", role);

        let path = format!(
            "/rest/v1/persons?role=eq.{}&{}&order=last_name.asc",
            role, PERSON_SELECT
        );
        let result: Vec<Value> = self
            .supabase
            .request_read(&path, Some(auth_token))
            .await
            .map_err(|e| PersonError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| PersonError::Database(e.to_string())))
            .collect()
    }

    pub async fn create_person(
        &self,
        request: CreatePersonRequest,
        auth_token: &str,
    ) -> Result<Person, PersonError> {
        validate_role_extensions(request.role, &request.doctor_profile, &request.patient_profile)?;

        let person_data = json!({
            "user_id": request.user_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "phone": request.phone,
            "role": request.role,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/persons",
                Some(auth_token),
                Some(person_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| PersonError::Database(e.to_string()))?;

        let mut person: Person = result
            .into_iter()
            .next()
            .ok_or_else(|| PersonError::Database("Insert returned no row".to_string()))
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| PersonError::Database(e.to_string()))
            })?;

        // Role extension lives in its own table, keyed by person id
        if let Some(profile) = &request.doctor_profile {
            let mut body = serde_json::to_value(profile)
                .map_err(|e| PersonError::Database(e.to_string()))?;
            body["person_id"] = json!(person.id);
            let _: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/doctor_profiles",
                    Some(auth_token),
                    Some(body),
                    Some(Self::representation_headers()),
                )
                .await
                .map_err(|e| PersonError::Database(e.to_string()))?;
            person.doctor_profile = request.doctor_profile.clone();
        }

        if let Some(profile) = &request.patient_profile {
            let mut body = serde_json::to_value(profile)
                .map_err(|e| PersonError::Database(e.to_string()))?;
            body["person_id"] = json!(person.id);
            let _: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/patient_profiles",
                    Some(auth_token),
                    Some(body),
                    Some(Self::representation_headers()),
                )
                .await
                .map_err(|e| PersonError::Database(e.to_string()))?;
            person.patient_profile = request.patient_profile.clone();
        }

        debug!("Person {} created with role {}", person.id, person.role);
        Ok(person)
    }

    pub async fn update_person(
        &self,
        person_id: i64,
        request: UpdatePersonRequest,
        auth_token: &str,
    ) -> Result<Person, PersonError> {
        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }

        if update_data.is_empty() {
            return self.get_person(person_id, auth_token).await;
        }

        let path = format!("/rest/v1/persons?id=eq.{}", person_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| PersonError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PersonError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PersonError::Database(e.to_string()))
    }
}
