// Expiry tracking core: window evaluation, digests, notification and scheduling
pub mod config;
pub mod digest;
pub mod error;
pub mod expiry;
pub mod notifier;
pub mod pipeline;
pub mod scheduler;

pub use config::Config;
pub use digest::{Digest, DigestItem, DigestSection};
pub use error::Error;
pub use expiry::{days_until_expiry, expiring_within, NotificationWindow};
pub use notifier::Notifier;
pub use pipeline::{ExpiryPipeline, OnDemandRequest, RunOutcome};
pub use scheduler::{DailyJob, DailySchedule, Scheduler};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
