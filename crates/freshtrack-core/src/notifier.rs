use std::sync::Arc;

use freshtrack_mail::{Email, MailTransport};
use tracing::{error, info};
use uuid::Uuid;

use crate::digest::Digest;
use crate::Result;

/// Turns a digest into one email and hands it to the transport
///
/// Never touches the store: it reports which products went out and
/// leaves persisting that to the caller.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    sender: String,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }

    pub fn compose(&self, recipient: &str, digest: &Digest) -> Email {
        Email {
            from: self.sender.clone(),
            to: recipient.to_string(),
            subject: digest.subject().to_string(),
            text: digest.to_text(),
            html: digest.to_html(),
        }
    }

    /// Send the digest once. No retries; the next run picks it up again.
    pub async fn send(&self, recipient: &str, digest: &Digest) -> Result<Vec<Uuid>> {
        let email = self.compose(recipient, digest);

        match self.transport.send(&email).await {
            Ok(()) => {
                info!(
                    "Expiry notification sent to {} ({} products)",
                    recipient,
                    digest.len()
                );
                Ok(digest.product_ids())
            }
            Err(e) => {
                error!("Failed to send expiry notification to {}: {}", recipient, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use freshtrack_mail::{MailError, MockMailTransport};
    use freshtrack_store::Product;

    fn digest() -> Digest {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let milk = Product {
            id: Uuid::new_v4(),
            name: "Milk".into(),
            expiry: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
            notification_sent: false,
            created_at: Utc::now(),
            image_url: None,
        };
        Digest::build(&[milk], today).unwrap()
    }

    #[tokio::test]
    async fn test_send_returns_notified_ids() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|email: &Email| {
                email.to == "me@example.com"
                    && email.from == "alerts@example.com"
                    && email.subject == "Product Expiration Alert"
                    && email.html.contains("Milk")
            })
            .times(1)
            .returning(|_| Ok(()));

        let notifier = Notifier::new(Arc::new(transport), "alerts@example.com");
        let digest = digest();
        let ids = notifier.send("me@example.com", &digest).await.unwrap();
        assert_eq!(ids, digest.product_ids());
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(MailError::Smtp("connection refused".into())));

        let notifier = Notifier::new(Arc::new(transport), "alerts@example.com");
        let err = notifier.send("me@example.com", &digest()).await.unwrap_err();
        assert!(matches!(err, crate::Error::Transport(_)));
    }
}
