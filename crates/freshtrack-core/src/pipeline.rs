// Evaluate -> batch -> send -> mark, shared by the daily job and on-demand requests
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use freshtrack_mail::parse_mailbox;
use freshtrack_store::{Product, ProductStore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::digest::Digest;
use crate::expiry::{expiring_within, NotificationWindow};
use crate::notifier::Notifier;
use crate::Result;

/// Client-triggered check against an explicit set of products
#[derive(Debug, Clone)]
pub struct OnDemandRequest {
    pub recipient: String,
    pub products: Vec<Product>,
    /// Falls back to the pipeline's configured window
    pub window: Option<NotificationWindow>,
}

/// What a single run ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No product qualified; nothing sent, nothing marked
    NothingToSend,
    Sent {
        recipient: String,
        notified: Vec<Uuid>,
        /// Rows whose flag actually flipped in the store
        marked: usize,
    },
}

impl RunOutcome {
    pub fn notified(&self) -> &[Uuid] {
        match self {
            RunOutcome::NothingToSend => &[],
            RunOutcome::Sent { notified, .. } => notified,
        }
    }
}

/// The expiry notification pipeline
///
/// Holds no state between runs; the `notification_sent` flags in the store
/// are what keep a product from being alerted twice.
pub struct ExpiryPipeline {
    store: Arc<dyn ProductStore>,
    notifier: Notifier,
    window: NotificationWindow,
}

impl ExpiryPipeline {
    pub fn new(store: Arc<dyn ProductStore>, notifier: Notifier, window: NotificationWindow) -> Self {
        Self {
            store,
            notifier,
            window,
        }
    }

    pub fn window(&self) -> NotificationWindow {
        self.window
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    /// Check the whole store and mail the operator
    pub async fn run_scheduled(&self, today: NaiveDate, recipient: &str) -> Result<RunOutcome> {
        let products = self.store.list().await?;
        debug!("Evaluating {} stored products", products.len());
        self.notify(&products, today, self.window, recipient).await
    }

    /// Check a caller-supplied subset with its own recipient and window
    ///
    /// The request only selects products; flags and dates come from the
    /// store, so a stale or repeated request cannot mail a product twice.
    /// Ids the store does not know are skipped.
    pub async fn run_on_demand(&self, request: OnDemandRequest, today: NaiveDate) -> Result<RunOutcome> {
        let window = request.window.unwrap_or(self.window);

        let mut stored: HashMap<Uuid, Product> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let selected: Vec<Product> = request
            .products
            .iter()
            .filter_map(|requested| {
                let found = stored.remove(&requested.id);
                if found.is_none() {
                    warn!("Skipping unknown product {} ({})", requested.name, requested.id);
                }
                found
            })
            .collect();

        self.notify(&selected, today, window, &request.recipient)
            .await
    }

    /// Preview the digest a scheduled run would send, without side effects
    pub async fn preview(&self, today: NaiveDate) -> Result<Option<Digest>> {
        let products = self.store.list().await?;
        let due = expiring_within(&products, today, self.window);
        Ok(Digest::build(&due, today))
    }

    async fn notify(
        &self,
        products: &[Product],
        today: NaiveDate,
        window: NotificationWindow,
        recipient: &str,
    ) -> Result<RunOutcome> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(crate::Error::Validation("recipient email is required".into()));
        }
        parse_mailbox(recipient).map_err(|e| crate::Error::Validation(e.to_string()))?;

        let due = expiring_within(products, today, window);
        let Some(digest) = Digest::build(&due, today) else {
            info!("No products expiring within {} days", window.days());
            return Ok(RunOutcome::NothingToSend);
        };

        let notified = self.notifier.send(recipient, &digest).await?;

        // A failure here after a successful send means the same products may
        // be mailed again next run
        let marked = self.store.mark_notified(&notified).await.map_err(|e| {
            error!(
                "Sent notification but failed to mark {} products: {}",
                notified.len(),
                e
            );
            crate::Error::from(e)
        })?;

        info!(
            "Marked {} of {} notified products as sent",
            marked,
            notified.len()
        );

        Ok(RunOutcome::Sent {
            recipient: recipient.to_string(),
            notified,
            marked,
        })
    }
}
