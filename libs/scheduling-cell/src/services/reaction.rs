use std::sync::Arc;
use tracing::{debug, info};

use notification_cell::services::inbox::InboxClient;
use notification_cell::{NotificationMessage, NotificationUrgency};
use shared_models::auth::User;

use crate::models::{Appointment, SchedulingError};
use crate::services::scheduler::SchedulingService;

/// What the presentation layer should do after a notification was opened.
#[derive(Debug)]
pub enum ReactionPrompt {
    /// Plain informational message; nothing further to do.
    Acknowledged,
    /// The receiver must accept or reject; feed the answer to `decide`.
    DecisionRequired { notification: NotificationMessage },
}

/// Reacts to a user opening an action-required notification: marks it
/// read, and on an accept/reject decision calls back into the scheduler
/// and re-enters the notify cycle.
pub struct ReactionService {
    scheduler: Arc<SchedulingService>,
    inbox: Arc<dyn InboxClient>,
}

impl ReactionService {
    pub fn new(scheduler: Arc<SchedulingService>, inbox: Arc<dyn InboxClient>) -> Self {
        Self { scheduler, inbox }
    }

    pub async fn open(
        &self,
        mut notification: NotificationMessage,
        principal: &User,
    ) -> Result<ReactionPrompt, SchedulingError> {
        debug!("Opening notification {}", notification.id);

        notification.read = true;
        self.inbox.update(principal, &notification).await?;

        if notification.notification_status == NotificationUrgency::ActionRequired {
            Ok(ReactionPrompt::DecisionRequired { notification })
        } else {
            Ok(ReactionPrompt::Acknowledged)
        }
    }

    /// On success the originating notification is downgraded to INFO and
    /// re-persisted. When the appointment no longer resolves, the
    /// notification is left untouched and `NotFound` is surfaced.
    pub async fn decide(
        &self,
        accepted: bool,
        mut notification: NotificationMessage,
        principal: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .scheduler
            .accept_schedule(accepted, &notification, auth_token)
            .await?
            .ok_or(SchedulingError::NotFound)?;

        notification.notification_status = NotificationUrgency::Info;
        notification.read = true;
        self.inbox.update(principal, &notification).await?;

        info!(
            "Decision {} recorded for appointment {} via notification {}",
            if accepted { "accept" } else { "reject" },
            appointment.id,
            notification.id
        );

        Ok(appointment)
    }
}
