use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, StoreError};

/// A tracked product and its expiry date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: Uuid,
    pub name: String,
    pub expiry: NaiveDate,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Validated input for creating a product
///
/// The only way to build one is `parse`, so a store never sees an empty
/// name or an unreadable date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    name: String,
    expiry: NaiveDate,
    image_url: Option<String>,
}

impl NewProduct {
    pub fn parse(name: &str, expiry: &str, image_url: Option<String>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("Product name is required".into()));
        }

        let expiry = parse_expiry(expiry)?;
        let image_url = image_url.filter(|url| !url.trim().is_empty());

        Ok(Self {
            name: name.to_string(),
            expiry,
            image_url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Turn the input into a stored record with a fresh id
    pub fn into_product(self) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: self.name,
            expiry: self.expiry,
            notification_sent: false,
            created_at: Utc::now(),
            image_url: self.image_url,
        }
    }
}

/// Parse an expiry date as sent by the browser client
///
/// Accepts plain dates (`2026-10-22`), RFC 3339 timestamps and the
/// `datetime-local` form (`2026-10-22T18:30`). Only the date part is kept.
pub fn parse_expiry(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts.date());
        }
    }

    Err(StoreError::Validation(format!(
        "Invalid expiry date: {:?}",
        raw
    )))
}
