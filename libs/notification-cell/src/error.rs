use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote service returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Credential error: {0}")]
    Credential(String),
}
