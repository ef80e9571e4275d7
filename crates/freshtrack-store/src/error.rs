use thiserror::Error;
use uuid::Uuid;

/// Things that can go wrong talking to the product store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid product: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
