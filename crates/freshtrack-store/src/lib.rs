// Product persistence: SQLite for real deployments, memory for tests

pub mod error;
pub mod memory;
pub mod product;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryProductStore;
pub use product::{parse_expiry, NewProduct, Product};
pub use sqlite::SqliteProductStore;
pub use store::ProductStore;

pub type Result<T> = std::result::Result<T, StoreError>;
