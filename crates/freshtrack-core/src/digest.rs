use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use freshtrack_store::Product;
use uuid::Uuid;

use crate::expiry::days_until_expiry;

pub const DIGEST_SUBJECT: &str = "Product Expiration Alert";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single product line in the digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestItem {
    pub id: Uuid,
    pub name: String,
    pub expiry: NaiveDate,
}

/// All products sharing the same number of days left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub days_left: i64,
    pub items: Vec<DigestItem>,
}

impl DigestSection {
    pub fn heading(&self) -> String {
        let unit = if self.days_left == 1 { "day" } else { "days" };
        format!("Expiring in {} {}:", self.days_left, unit)
    }
}

/// Grouped summary of expiring products, one email's worth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    sections: Vec<DigestSection>,
}

impl Digest {
    /// Group products by days remaining, soonest first
    ///
    /// Returns `None` for an empty input so callers can skip sending.
    /// Items inside a section keep the order they were given in.
    pub fn build(products: &[Product], today: NaiveDate) -> Option<Self> {
        if products.is_empty() {
            return None;
        }

        let mut groups: BTreeMap<i64, Vec<DigestItem>> = BTreeMap::new();
        for product in products {
            groups
                .entry(days_until_expiry(product.expiry, today))
                .or_default()
                .push(DigestItem {
                    id: product.id,
                    name: product.name.clone(),
                    expiry: product.expiry,
                });
        }

        let sections = groups
            .into_iter()
            .map(|(days_left, items)| DigestSection { days_left, items })
            .collect();

        Some(Self { sections })
    }

    pub fn sections(&self) -> &[DigestSection] {
        &self.sections
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.sections
            .iter()
            .flat_map(|s| s.items.iter().map(|item| item.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subject(&self) -> &'static str {
        DIGEST_SUBJECT
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<h1>Product Expiration Alert</h1>");
        html.push_str("<p>The following products are expiring soon:</p>");
        html.push_str("<ul>");
        for section in &self.sections {
            let _ = write!(html, "<h3>{}</h3>", section.heading());
            for item in &section.items {
                let _ = write!(
                    html,
                    "<li><strong>{}</strong> - Expires on {}</li>",
                    escape_html(&item.name),
                    item.expiry.format(DATE_FORMAT)
                );
            }
        }
        html.push_str("</ul>");
        html
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        text.push_str("Product Expiration Alert\n\n");
        text.push_str("The following products are expiring soon:\n");
        for section in &self.sections {
            let _ = write!(text, "\n{}\n", section.heading());
            for item in &section.items {
                let _ = writeln!(
                    text,
                    "  - {} - Expires on {}",
                    item.name,
                    item.expiry.format(DATE_FORMAT)
                );
            }
        }
        text
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
