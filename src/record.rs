use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// One scraped item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub product_no: String,
    pub brand: String,
    pub product_info: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_and_fit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_bio: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageDescriptor>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub image_no: String,
    pub link: String,
}

impl ImageDescriptor {
    /// `position` is 1-based.
    pub fn new(product_no: &str, position: usize, link: String) -> Self {
        ImageDescriptor {
            image_no: format!("{}_{}", product_no, position),
            link,
        }
    }
}

/// One subcategory listing to traverse. Names are slugs (see `site::slugify`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    pub department: String,
    pub category: String,
    pub subcategory: String,
    pub listing_url: String,
}

impl ScrapeTarget {
    /// Relational namespace holding this department's tables.
    pub fn namespace(&self) -> String {
        format!("{}_data", self.department)
    }
}

/// Parse a displayed price such as `"$1,234.50"` or `"£ 19.99"`.
///
/// Leading currency symbols and whitespace are dropped, thousands separators removed.
pub fn parse_price(text: &str) -> Result<f64, ScrapeError> {
    let digits: String = text
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .filter(|c| *c != ',')
        .collect();
    digits
        .trim()
        .parse::<f64>()
        .map_err(|_| ScrapeError::InvalidPrice(text.to_string()))
}

/// Checks that a product number can name a directory and an object key without
/// leaving its parent: ASCII letters, digits, `-`, `_` and non-leading `.` only,
/// and never `..`.
pub fn check_product_no(product_no: &str) -> Result<(), ScrapeError> {
    let usable = !product_no.is_empty()
        && !product_no.starts_with('.')
        && !product_no.contains("..")
        && product_no
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if usable {
        Ok(())
    } else {
        Err(ScrapeError::InvalidProductNo(product_no.to_string()))
    }
}

/// Collapse `'s` to `s`, then turn any remaining apostrophe into `.`.
///
/// Rows written by earlier runs of the scraper were stored this way, so text columns
/// keep the same shape even though values are bound as parameters.
pub fn normalize_quotes(text: &str) -> String {
    text.replace("'s", "s").replace('\'', ".")
}
