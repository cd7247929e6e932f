use payloads::ClientError;

use crate::service::Failure;

/// Failure raised by the REST-backed services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a usable answer: connection, timeout or an
    /// unreadable body.
    #[error(transparent)]
    Transport(ClientError),
    /// A single-record lookup found nothing.
    #[error("{0}")]
    NotFound(String),
    /// The backend refused the write, usually with a validation message.
    #[error("{0}")]
    Rejected(String),
    #[error("{}", .0.as_deref().unwrap_or("Unknown error"))]
    Unknown(Option<String>),
}

impl Failure for ServiceError {
    fn message(&self) -> Option<String> {
        match self {
            Self::Unknown(None) => None,
            other => Some(other.to_string()),
        }
    }
}
