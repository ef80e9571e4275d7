// Which products are close enough to expiry to warrant an alert
use chrono::NaiveDate;
use freshtrack_store::Product;

/// Number of days before expiry in which a product becomes eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NotificationWindow(u32);

impl NotificationWindow {
    pub const DEFAULT_DAYS: u32 = 7;

    pub fn new(days: u32) -> crate::Result<Self> {
        if days == 0 {
            return Err(crate::Error::Validation(
                "notification window must be at least 1 day".into(),
            ));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl Default for NotificationWindow {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

/// Whole days from `today` until `expiry`
///
/// Expiry has day granularity, so this is the ceiling of the time left
/// measured from any instant during `today`. Zero means it expires today,
/// negative means it already has.
pub fn days_until_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

/// True when the product should be part of the next digest
pub fn is_due(product: &Product, today: NaiveDate, window: NotificationWindow) -> bool {
    if product.notification_sent {
        return false;
    }
    let days = days_until_expiry(product.expiry, today);
    // Expired or expiring today are not alerted
    days > 0 && days <= i64::from(window.days())
}

/// Products inside the window that have not been notified yet, in input order
pub fn expiring_within(
    products: &[Product],
    today: NaiveDate,
    window: NotificationWindow,
) -> Vec<Product> {
    let mut seen = std::collections::HashSet::new();
    products
        .iter()
        .filter(|p| is_due(p, today, window))
        .filter(|p| seen.insert(p.id))
        .cloned()
        .collect()
}
