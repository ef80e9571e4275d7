use freshtrack_mail::MailError;
use freshtrack_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// All the ways an expiry check or product operation can go wrong
///
/// Validation and not-found go back to whoever asked. Transport and store
/// failures inside a scheduled run get logged and the run is dropped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Mail transport failed: {0}")]
    Transport(#[from] MailError),

    #[error("Product store failed: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => Error::Validation(msg),
            StoreError::NotFound(id) => Error::NotFound(id),
            other => Error::Store(other.to_string()),
        }
    }
}
