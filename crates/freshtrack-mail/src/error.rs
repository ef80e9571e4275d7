use thiserror::Error;

/// Ways an outgoing email can fail
///
/// Variants carry rendered messages rather than lettre's error types so
/// callers (and test doubles) can build them freely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("Invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport failed: {0}")]
    Smtp(String),

    #[error("Mail transport not configured: {0}")]
    NotConfigured(String),
}

impl From<lettre::error::Error> for MailError {
    fn from(e: lettre::error::Error) -> Self {
        MailError::Build(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        MailError::Smtp(e.to_string())
    }
}
