pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentDetail, AppointmentDraft, ConflictPolicy, CreateAppointmentRequest,
    SchedulingError,
};
pub use router::scheduling_routes;
pub use services::conflict::ConflictDetector;
pub use services::reaction::{ReactionPrompt, ReactionService};
pub use services::scheduler::SchedulingService;
pub use services::store::{AppointmentStore, SupabaseAppointmentStore};
