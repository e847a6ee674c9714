use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::scheduling::PersonRole;

/// A party in the clinic directory, linked to exactly one auth account.
/// At most one role extension is populated and it must match `role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: PersonRole,
    #[serde(default)]
    pub doctor_profile: Option<DoctorProfile>,
    #[serde(default)]
    pub patient_profile: Option<PatientProfile>,
}

impl Person {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub license_number: String,
    pub license_state: Option<String>,
    pub specialty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub health_plan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePersonRequest {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: PersonRole,
    pub doctor_profile: Option<DoctorProfile>,
    pub patient_profile: Option<PatientProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PersonError {
    #[error("Person not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Role-extension invariant: a doctor profile only on doctors, a patient
/// profile only on patients, never both.
pub fn validate_role_extensions(
    role: PersonRole,
    doctor_profile: &Option<DoctorProfile>,
    patient_profile: &Option<PatientProfile>,
) -> Result<(), PersonError> {
    if doctor_profile.is_some() && role != PersonRole::Doctor {
        return Err(PersonError::Validation(
            "Doctor profile requires the doctor role".to_string(),
        ));
    }
    if patient_profile.is_some() && role != PersonRole::Patient {
        return Err(PersonError::Validation(
            "Patient profile requires the patient role".to_string(),
        ));
    }
    Ok(())
}
