// Outgoing mail: message building and the SMTP transport

pub mod error;
pub mod message;
pub mod smtp;
pub mod transport;

pub use error::MailError;
pub use message::{parse_mailbox, Email};
pub use smtp::{SmtpMailer, SmtpSettings};
pub use transport::{DisabledTransport, MailTransport};

#[cfg(any(test, feature = "mock"))]
pub use transport::MockMailTransport;

pub type Result<T> = std::result::Result<T, MailError>;
