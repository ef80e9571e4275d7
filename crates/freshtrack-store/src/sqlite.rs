use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::{NewProduct, Product, ProductStore, Result, StoreError};

const SELECT_COLUMNS: &str =
    "SELECT id, name, expiry, notification_sent, created_at, image_url FROM products";

/// Product store backed by SQLite
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Survives restarts, so notification flags stick
/// - Doesn't require a separate process
///
/// The connection sits behind a mutex; every operation is a short
/// statement so holding it across the call is fine.
pub struct SqliteProductStore {
    conn: Mutex<Connection>,
}

impl SqliteProductStore {
    /// Open (or create) the database at `path`. `":memory:"` works too.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        debug!("Opened product database at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                expiry TEXT NOT NULL,
                notification_sent INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                image_url TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_expiry ON products (expiry)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }

    fn find(conn: &Connection, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let product = conn
            .query_row(&sql, params![id.to_string()], row_to_product)
            .optional()?;
        Ok(product)
    }
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    let raw_id: String = row.get(0)?;
    let id = Uuid::parse_str(&raw_id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(Product {
        id,
        name: row.get(1)?,
        expiry: row.get(2)?,
        notification_sent: row.get(3)?,
        created_at: row.get(4)?,
        image_url: row.get(5)?,
    })
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn list(&self) -> Result<Vec<Product>> {
        let conn = self.lock()?;
        let sql = format!("{SELECT_COLUMNS} ORDER BY expiry ASC, created_at ASC");
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map([], row_to_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> Result<Product> {
        let conn = self.lock()?;
        Self::find(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, input: NewProduct) -> Result<Product> {
        let product = input.into_product();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO products (id, name, expiry, notification_sent, created_at, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.id.to_string(),
                product.name,
                product.expiry,
                product.notification_sent,
                product.created_at,
                product.image_url,
            ],
        )?;
        debug!("Stored product {} ({})", product.name, product.id);
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> Result<Product> {
        let conn = self.lock()?;
        let product = Self::find(&conn, id)?.ok_or(StoreError::NotFound(id))?;
        conn.execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])?;
        Ok(product)
    }

    async fn mark_notified(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE products SET notification_sent = 1
                 WHERE id = ?1 AND notification_sent = 0",
            )?;
            for id in ids {
                updated += stmt.execute(params![id.to_string()])?;
            }
        }
        tx.commit()?;

        Ok(updated)
    }
}
