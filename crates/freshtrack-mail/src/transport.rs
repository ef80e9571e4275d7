use async_trait::async_trait;

use crate::{Email, Result};

/// Anything that can deliver an [`Email`]
///
/// The SMTP mailer is the production implementation; tests swap in a mock.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Stand-in used when no mail credentials are configured
///
/// Every send fails, so runs are logged as failed and no product is marked.
pub struct DisabledTransport {
    reason: String,
}

impl DisabledTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MailTransport for DisabledTransport {
    async fn send(&self, _email: &Email) -> Result<()> {
        Err(crate::MailError::NotConfigured(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_transport_always_fails() {
        let transport = DisabledTransport::new("EMAIL_USER is not set");
        let email = Email {
            from: "a@example.com".into(),
            to: "b@example.com".into(),
            subject: "s".into(),
            text: "t".into(),
            html: "h".into(),
        };

        let err = transport.send(&email).await.unwrap_err();
        assert_eq!(
            err,
            crate::MailError::NotConfigured("EMAIL_USER is not set".into())
        );
    }
}
