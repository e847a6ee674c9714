pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DoctorProfile, PatientProfile, Person, PersonError};
pub use router::person_routes;
pub use services::person::PersonService;
