use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use notification_cell::services::dispatcher::NotificationDispatcher;
use notification_cell::services::inbox::InboxClient;
use notification_cell::{
    NotificationDraft, NotificationError, NotificationMessage, NotificationUrgency,
};
use person_cell::Person;
use scheduling_cell::models::{
    Appointment, AppointmentDetail, AppointmentDraft, ConflictPolicy, CreateAppointmentRequest,
    SchedulingError,
};
use scheduling_cell::services::conflict::intervals_overlap;
use scheduling_cell::services::reaction::{ReactionPrompt, ReactionService};
use scheduling_cell::services::scheduler::SchedulingService;
use scheduling_cell::services::store::AppointmentStore;
use shared_models::auth::User;
use shared_models::scheduling::{AppointmentStatus, PersonRole};

const DOCTOR_ID: i64 = 3;
const PATIENT_ID: i64 = 7;

// ==============================================================================
// TEST DOUBLES
// ==============================================================================

#[derive(Default)]
struct InMemoryStore {
    rows: Mutex<Vec<Appointment>>,
    persons: Mutex<HashMap<i64, Person>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    fn with_person(self, person: Person) -> Self {
        self.persons.lock().unwrap().insert(person.id, person);
        self
    }

    fn stored(&self, id: i64) -> Option<Appointment> {
        self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert(
        &self,
        draft: &AppointmentDraft,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let now = Utc::now();
        let appointment = Appointment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            start_time: draft.start_time,
            end_time: draft.end_time,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status,
            doctor_person_id: draft.doctor_person_id,
            patient_person_id: draft.patient_person_id,
            external_patient_name: draft.external_patient_name.clone(),
            external_patient_phone: draft.external_patient_phone.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &self,
        appointment: &Appointment,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or(SchedulingError::NotFound)?;

        if row.version != appointment.version {
            return Err(SchedulingError::ConcurrentModification);
        }

        *row = Appointment {
            version: appointment.version + 1,
            updated_at: Utc::now(),
            ..appointment.clone()
        };
        Ok(row.clone())
    }

    async fn find_by_id(
        &self,
        id: i64,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        Ok(self.stored(id))
    }

    async fn find_by_id_with_details(
        &self,
        id: i64,
        _auth_token: &str,
    ) -> Result<Option<AppointmentDetail>, SchedulingError> {
        Ok(self.stored(id).map(|appointment| {
            let persons = self.persons.lock().unwrap();
            AppointmentDetail {
                doctor: persons.get(&appointment.doctor_person_id).cloned(),
                patient: appointment
                    .patient_person_id
                    .and_then(|pid| persons.get(&pid).cloned()),
                appointment,
            }
        }))
    }

    async fn find_by_doctor(
        &self,
        doctor_person_id: i64,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.doctor_person_id == doctor_person_id)
            .cloned()
            .collect())
    }

    async fn find_by_patient(
        &self,
        person_id: i64,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.patient_person_id == Some(person_id))
            .cloned()
            .collect())
    }

    async fn find_related_to_person(
        &self,
        person_id: i64,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut related: Vec<Appointment> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.doctor_person_id == person_id || a.patient_person_id == Some(person_id)
            })
            .cloned()
            .collect();
        related.sort_by_key(|a| a.start_time);
        Ok(related)
    }

    async fn find_by_doctor_in_range(
        &self,
        doctor_person_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut rows: Vec<Appointment> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.doctor_person_id == doctor_person_id
                    && a.start_time >= from
                    && a.start_time <= to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn find_conflicting(
        &self,
        doctor_person_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
        policy: &ConflictPolicy,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.doctor_person_id == doctor_person_id
                    && Some(a.id) != exclude_id
                    && intervals_overlap(a.start_time, a.end_time, start, end)
                    && policy.blocks(a.status)
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64, _auth_token: &str) -> Result<(), SchedulingError> {
        self.rows.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationDraft>>,
}

impl RecordingDispatcher {
    fn drafts(&self) -> Vec<NotificationDraft> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, draft: &NotificationDraft) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(draft.clone());
        Ok(())
    }
}

struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _draft: &NotificationDraft) -> Result<(), NotificationError> {
        Err(NotificationError::Publish("queue unreachable".to_string()))
    }
}

#[derive(Default)]
struct RecordingInbox {
    updates: Mutex<Vec<NotificationMessage>>,
}

impl RecordingInbox {
    fn updated(&self) -> Vec<NotificationMessage> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl InboxClient for RecordingInbox {
    async fn list_by_receiver(
        &self,
        _principal: &User,
        _receiver_id: i64,
    ) -> Result<Vec<NotificationMessage>, NotificationError> {
        Ok(Vec::new())
    }

    async fn count_unread(
        &self,
        _principal: &User,
        _receiver_id: i64,
    ) -> Result<i64, NotificationError> {
        Ok(0)
    }

    async fn update(
        &self,
        _principal: &User,
        notification: &NotificationMessage,
    ) -> Result<(), NotificationError> {
        self.updates.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ==============================================================================
// FIXTURES
// ==============================================================================

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

fn patient_person() -> Person {
    Person {
        id: PATIENT_ID,
        user_id: uuid::Uuid::new_v4(),
        first_name: "Maria".to_string(),
        last_name: "Silva".to_string(),
        phone: None,
        role: PersonRole::Patient,
        doctor_profile: None,
        patient_profile: None,
    }
}

fn booking_request(start: DateTime<Utc>, end: DateTime<Utc>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        start_time: start,
        end_time: end,
        title: "Consultation".to_string(),
        description: None,
        doctor_person_id: DOCTOR_ID,
        patient_person_id: Some(PATIENT_ID),
        external_patient_name: None,
        external_patient_phone: None,
    }
}

fn service_with(
    store: Arc<InMemoryStore>,
    dispatcher: Arc<RecordingDispatcher>,
) -> SchedulingService {
    SchedulingService::new(store, dispatcher)
}

fn notification_for(appointment: &Appointment) -> NotificationMessage {
    NotificationMessage {
        id: 100,
        sender_id: PATIENT_ID,
        receiver_id: DOCTOR_ID,
        appointment_id: appointment.id,
        title: "Scheduling request".to_string(),
        message: "Maria Silva requested an appointment with you".to_string(),
        read: false,
        notification_status: NotificationUrgency::ActionRequired,
        created_at: Utc::now(),
    }
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn patient_request_starts_pending_and_notifies_the_doctor() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::RequestPending);

    let drafts = dispatcher.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].receiver_id, DOCTOR_ID);
    assert_eq!(drafts[0].sender_id, PATIENT_ID);
    assert_eq!(drafts[0].notification_status, NotificationUrgency::ActionRequired);
    assert!(!drafts[0].read);
    assert_eq!(
        drafts[0].message,
        "Maria Silva requested an appointment with you"
    );
}

#[tokio::test]
async fn doctor_direct_booking_is_scheduled_without_notification() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(9, 0), at(9, 30)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert!(dispatcher.drafts().is_empty());
}

#[tokio::test]
async fn inverted_interval_fails_validation_before_any_persistence() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let err = service
        .create(booking_request(at(15, 0), at(14, 0)), PersonRole::Patient, "token")
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulingError::Validation(_)));
    assert_eq!(store.count(), 0);
    assert!(dispatcher.drafts().is_empty());
}

#[tokio::test]
async fn missing_patient_party_fails_validation() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(store, dispatcher);

    let mut request = booking_request(at(9, 0), at(10, 0));
    request.patient_person_id = None;
    request.external_patient_name = Some("   ".to_string());

    let err = service
        .create(request, PersonRole::Doctor, "token")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
}

#[tokio::test]
async fn overlapping_request_is_rejected_and_touching_request_is_accepted() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), dispatcher);

    // Doctor already booked 09:00-10:00
    service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    // 09:30-10:30 overlaps
    let err = service
        .create(booking_request(at(9, 30), at(10, 30)), PersonRole::Patient, "token")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict));

    // 10:00-11:00 touches the boundary and must pass
    let touching = service
        .create(booking_request(at(10, 0), at(11, 0)), PersonRole::Patient, "token")
        .await
        .unwrap();
    assert_eq!(touching.status, AppointmentStatus::RequestPending);
}

#[tokio::test]
async fn cancelled_appointments_do_not_block_rebooking_by_default() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), dispatcher);

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();
    service
        .update_status(appointment.id, AppointmentStatus::Cancelled, "token")
        .await
        .unwrap();

    // The freed slot can be booked again
    let rebooked = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();
    assert_eq!(rebooked.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn strict_policy_keeps_cancelled_slots_blocked() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = SchedulingService::with_policy(
        Arc::clone(&store) as Arc<dyn AppointmentStore>,
        dispatcher,
        ConflictPolicy::including_terminal(),
    );

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();
    service
        .update_status(appointment.id, AppointmentStatus::Cancelled, "token")
        .await
        .unwrap();

    let err = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict));
}

#[tokio::test]
async fn dispatch_failure_does_not_roll_back_the_committed_booking() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let service = SchedulingService::new(
        Arc::clone(&store) as Arc<dyn AppointmentStore>,
        Arc::new(FailingDispatcher),
    );

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::RequestPending);
    assert!(store.stored(appointment.id).is_some());
}

// ==============================================================================
// STATUS TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn update_status_persists_and_notifies_every_call() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    let cancelled = service
        .update_status(appointment.id, AppointmentStatus::Cancelled, "token")
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let drafts = dispatcher.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].title, "Appointment cancelled");

    // Idempotent in stored effect, but each call dispatches again
    let cancelled_again = service
        .update_status(appointment.id, AppointmentStatus::Cancelled, "token")
        .await
        .unwrap();
    assert_eq!(cancelled_again.status, AppointmentStatus::Cancelled);
    assert_eq!(dispatcher.drafts().len(), 2);
}

#[tokio::test]
async fn illegal_jumps_are_refused() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();
    service
        .update_status(appointment.id, AppointmentStatus::Completed, "token")
        .await
        .map(|_| ())
        .unwrap_err();

    // The stored status did not move
    assert_eq!(
        store.stored(appointment.id).unwrap().status,
        AppointmentStatus::Scheduled
    );
    assert!(dispatcher.drafts().is_empty());
}

#[tokio::test]
async fn update_status_on_missing_appointment_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(store, dispatcher);

    let err = service
        .update_status(999, AppointmentStatus::Cancelled, "token")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound));
}

// ==============================================================================
// RESCHEDULE
// ==============================================================================

#[tokio::test]
async fn reschedule_revalidates_without_conflicting_with_itself() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), dispatcher);

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    // Shifting within its own slot must not self-conflict
    let moved = service
        .reschedule(appointment.id, at(9, 30), at(10, 30), "token")
        .await
        .unwrap();
    assert_eq!(moved.start_time, at(9, 30));
    assert_eq!(moved.end_time, at(10, 30));
}

#[tokio::test]
async fn reschedule_into_another_booking_is_refused() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), dispatcher);

    service
        .create(booking_request(at(11, 0), at(12, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();
    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    let err = service
        .reschedule(appointment.id, at(11, 30), at(12, 30), "token")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict));
}

// ==============================================================================
// ACCEPT / REJECT
// ==============================================================================

#[tokio::test]
async fn accepting_a_request_schedules_and_dispatches_once_more() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();
    assert_eq!(dispatcher.drafts().len(), 1);

    let accepted = service
        .accept_schedule(true, &notification_for(&appointment), "token")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accepted.status, AppointmentStatus::Scheduled);
    let drafts = dispatcher.drafts();
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[1].title, "Appointment confirmed");
    assert_eq!(drafts[1].notification_status, NotificationUrgency::Info);
}

#[tokio::test]
async fn rejecting_a_request_cancels() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();

    let rejected = service
        .accept_schedule(false, &notification_for(&appointment), "token")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(rejected.status, AppointmentStatus::Cancelled);
    assert_eq!(dispatcher.drafts().len(), 2);
    assert_eq!(dispatcher.drafts()[1].title, "Appointment cancelled");
}

#[tokio::test]
async fn accept_schedule_on_missing_appointment_returns_none() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(store, Arc::clone(&dispatcher));

    let notification = NotificationMessage {
        id: 9,
        sender_id: PATIENT_ID,
        receiver_id: DOCTOR_ID,
        appointment_id: 999,
        title: "Scheduling request".to_string(),
        message: "Maria Silva requested an appointment with you".to_string(),
        read: true,
        notification_status: NotificationUrgency::ActionRequired,
        created_at: Utc::now(),
    };

    let result = service
        .accept_schedule(true, &notification, "token")
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(dispatcher.drafts().is_empty());
}

// ==============================================================================
// REACTION HANDLER
// ==============================================================================

fn reaction_setup(
    store: Arc<InMemoryStore>,
    dispatcher: Arc<RecordingDispatcher>,
) -> (ReactionService, Arc<RecordingInbox>) {
    let scheduler = Arc::new(service_with(store, dispatcher));
    let inbox = Arc::new(RecordingInbox::default());
    (
        ReactionService::new(scheduler, Arc::clone(&inbox) as Arc<dyn InboxClient>),
        inbox,
    )
}

fn principal() -> User {
    User {
        id: "doctor-user".to_string(),
        email: Some("doctor@example.com".to_string()),
        role: Some("doctor".to_string()),
        metadata: None,
        created_at: None,
    }
}

#[tokio::test]
async fn opening_an_action_required_notification_marks_read_and_prompts() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();

    let (reaction, inbox) = reaction_setup(store, dispatcher);
    let prompt = reaction
        .open(notification_for(&appointment), &principal())
        .await
        .unwrap();

    let updates = inbox.updated();
    assert_eq!(updates.len(), 1);
    assert!(updates[0].read);
    assert!(matches!(prompt, ReactionPrompt::DecisionRequired { .. }));
}

#[tokio::test]
async fn opening_an_info_notification_only_acknowledges() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let (reaction, inbox) = reaction_setup(store, dispatcher);

    let notification = NotificationMessage {
        id: 5,
        sender_id: PATIENT_ID,
        receiver_id: DOCTOR_ID,
        appointment_id: 1,
        title: "Appointment confirmed".to_string(),
        message: "Appointment #1 was successfully scheduled".to_string(),
        read: false,
        notification_status: NotificationUrgency::Info,
        created_at: Utc::now(),
    };

    let prompt = reaction.open(notification, &principal()).await.unwrap();

    assert!(matches!(prompt, ReactionPrompt::Acknowledged));
    assert_eq!(inbox.updated().len(), 1);
}

#[tokio::test]
async fn deciding_accept_downgrades_the_notification_to_info() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(14, 0), at(14, 30)), PersonRole::Patient, "token")
        .await
        .unwrap();

    let (reaction, inbox) = reaction_setup(Arc::clone(&store), Arc::clone(&dispatcher));
    let decided = reaction
        .decide(true, notification_for(&appointment), &principal(), "token")
        .await
        .unwrap();

    assert_eq!(decided.status, AppointmentStatus::Scheduled);

    let updates = inbox.updated();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].notification_status, NotificationUrgency::Info);
    assert!(updates[0].read);

    // One draft for the request, one for the acceptance
    assert_eq!(dispatcher.drafts().len(), 2);
}

#[tokio::test]
async fn deciding_on_a_missing_appointment_leaves_the_notification_alone() {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let (reaction, inbox) = reaction_setup(store, dispatcher);

    let notification = NotificationMessage {
        id: 9,
        sender_id: PATIENT_ID,
        receiver_id: DOCTOR_ID,
        appointment_id: 12345,
        title: "Scheduling request".to_string(),
        message: "Maria Silva requested an appointment with you".to_string(),
        read: true,
        notification_status: NotificationUrgency::ActionRequired,
        created_at: Utc::now(),
    };

    let err = reaction
        .decide(true, notification, &principal(), "token")
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulingError::NotFound));
    assert!(inbox.updated().is_empty());
}

// ==============================================================================
// DELETE
// ==============================================================================

#[tokio::test]
async fn delete_bypasses_the_state_machine_and_notify_path() {
    let store = Arc::new(InMemoryStore::new().with_person(patient_person()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = service_with(Arc::clone(&store), Arc::clone(&dispatcher));

    let appointment = service
        .create(booking_request(at(9, 0), at(10, 0)), PersonRole::Doctor, "token")
        .await
        .unwrap();

    service.delete(appointment.id, "token").await.unwrap();

    assert!(store.stored(appointment.id).is_none());
    assert!(dispatcher.drafts().is_empty());
}
