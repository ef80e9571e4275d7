use async_trait::async_trait;
use uuid::Uuid;

use crate::{NewProduct, Product, Result};

/// Capabilities the notification pipeline and the HTTP layer need from
/// product persistence
///
/// Async so a networked backend can slot in without touching callers.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, soonest expiry first
    async fn list(&self) -> Result<Vec<Product>>;

    async fn get(&self, id: Uuid) -> Result<Product>;

    async fn create(&self, input: NewProduct) -> Result<Product>;

    /// Remove a product, returning the removed record
    async fn delete(&self, id: Uuid) -> Result<Product>;

    /// Set `notification_sent` on the given products
    ///
    /// Unknown ids are skipped. Returns how many rows flipped.
    async fn mark_notified(&self, ids: &[Uuid]) -> Result<usize>;
}
