use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::browser::Locator;
use crate::config::Department;

const DEFAULT_PROFILE: &str = include_str!("../sites/default.toml");

/// Fixed tail of a listing URL past the `{root}{department}{category}{subcategory}` text.
pub const LINK_OFFSET_PADDING: usize = 10;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct SiteProfile {
    pub root: String,
    pub departments: DepartmentPaths,
    pub locators: Locators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentPaths {
    pub men: String,
    pub women: String,
    pub kids: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Locators {
    pub cookie_accept: Locator,
    pub promotion_close: Locator,
    pub category: Locator,
    pub subcategory: Locator,
    pub item_link: Locator,
    pub product_no: Locator,
    pub brand: Locator,
    pub product_info: Locator,
    pub price: Locator,
    pub price_sale: Locator,
    pub heading_active: Locator,
    pub size_and_fit_inactive: Locator,
    pub size_and_fit: Locator,
    pub brand_bio_inactive: Locator,
    pub brand_bio: Locator,
    pub images: Locator,
}

impl SiteProfile {
    /// Load a profile from `path`, or the bundled default when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read site profile {}", p.display()))?;
                Self::parse(&raw).with_context(|| format!("Invalid site profile {}", p.display()))
            }
            None => Self::parse(DEFAULT_PROFILE).context("Invalid bundled site profile"),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut profile: SiteProfile = toml::from_str(raw)?;
        profile.root = profile.root.trim_end_matches('/').to_string();
        Ok(profile)
    }

    pub fn department_path(&self, department: Department) -> &str {
        match department {
            Department::Men => &self.departments.men,
            Department::Women => &self.departments.women,
            Department::Kids => &self.departments.kids,
        }
    }

    pub fn department_url(&self, department: Department) -> String {
        format!("{}/{}", self.root, self.department_path(department))
    }
}

/// Width of the URL prefix that every item link on a subcategory listing shares.
///
/// Listing pages link items as `{root}/{department}/{category}/{subcategory}/…`
/// followed by a fixed-width segment; everything past this offset identifies
/// the item itself. Lengths are counted in characters.
pub fn compute_link_offset(site_root: &str, department: &str, category: &str, subcategory: &str) -> usize {
    site_root.chars().count()
        + department.chars().count()
        + category.chars().count()
        + subcategory.chars().count()
        + LINK_OFFSET_PADDING
}

/// Link offset for a subcategory listing, taken from the listing URL's own path.
///
/// Display names are often longer or shorter than the URL segments they link
/// to, so only the segments themselves count. The first segment after the root
/// is the department, the last the subcategory, anything between the category.
/// A listing on another origin is measured from its own `scheme://host`.
pub fn listing_link_offset(site_root: &str, listing_url: &str) -> usize {
    let url = listing_url.split(['?', '#']).next().unwrap_or(listing_url);
    let (prefix, rest) = match url.strip_prefix(site_root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => (site_root, rest),
        _ => split_origin(url),
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let (department, category, subcategory) = match segments.as_slice() {
        [] => ("", String::new(), ""),
        [only] => (*only, String::new(), ""),
        [first, middle @ .., last] => (*first, middle.concat(), *last),
    };
    compute_link_offset(prefix, department, &category, subcategory)
}

fn split_origin(url: &str) -> (&str, &str) {
    let host_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[host_start..].find('/') {
        Some(i) => url.split_at(host_start + i),
        None => (url, ""),
    }
}

/// Lowercase, collapse everything outside `[a-z0-9]` into single underscores.
///
/// Used for directory names and SQL identifiers, so the output never needs quoting
/// beyond the usual identifier quotes.
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase().replace('&', "and");
    NON_WORD_RE
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}
