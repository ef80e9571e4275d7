use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{NewProduct, Product, ProductStore, Result, StoreError};

/// In-memory product store, handy for tests and throwaway runs
#[derive(Default)]
pub struct MemoryProductStore {
    products: Mutex<Vec<Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, e.g. ones already flagged
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Product>>> {
        self.products
            .lock()
            .map_err(|_| StoreError::Unavailable("product list lock poisoned".into()))
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>> {
        let mut products = self.lock()?.clone();
        // Stable sort keeps insertion order for equal expiry dates
        products.sort_by_key(|p| p.expiry);
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> Result<Product> {
        self.lock()?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, input: NewProduct) -> Result<Product> {
        let product = input.into_product();
        self.lock()?.push(product.clone());
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> Result<Product> {
        let mut products = self.lock()?;
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(products.remove(index))
    }

    async fn mark_notified(&self, ids: &[Uuid]) -> Result<usize> {
        let mut products = self.lock()?;
        let mut updated = 0;
        for product in products.iter_mut() {
            if !product.notification_sent && ids.contains(&product.id) {
                product.notification_sent = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
