use std::collections::HashSet;

use tracing::{info, warn};

use crate::browser::{Browser, Locator, Waiter};
use crate::config::Department;
use crate::error::ScrapeError;
use crate::record::ScrapeTarget;
use crate::site::{slugify, SiteProfile, LINK_OFFSET_PADDING};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub name: String,
    pub url: String,
}

/// Category links on a department's landing page.
pub async fn categories(
    browser: &dyn Browser,
    site: &SiteProfile,
    waiter: &Waiter,
    department: Department,
) -> Result<Vec<NavLink>, ScrapeError> {
    let url = site.department_url(department);
    browser.navigate(&url).await?;
    let found = nav_links(browser, waiter, &site.locators.category).await?;
    info!("Found {} categories in the {} department", found.len(), department);
    Ok(found)
}

/// Visit each category and expand it into one target per subcategory listing.
pub async fn subcategory_targets(
    browser: &dyn Browser,
    site: &SiteProfile,
    waiter: &Waiter,
    department: Department,
    categories: &[NavLink],
) -> Result<Vec<ScrapeTarget>, ScrapeError> {
    let department_path = slugify(site.department_path(department));
    let mut targets = Vec::new();
    for category in categories {
        browser.navigate(&category.url).await?;
        for sub in nav_links(browser, waiter, &site.locators.subcategory).await? {
            targets.push(ScrapeTarget {
                department: department_path.clone(),
                category: category.name.clone(),
                subcategory: sub.name,
                listing_url: sub.url,
            });
        }
    }
    Ok(targets)
}

/// Item links on the loaded listing page, in page order.
pub async fn item_links(
    browser: &dyn Browser,
    waiter: &Waiter,
    locator: &Locator,
    offset: usize,
) -> Result<Vec<String>, ScrapeError> {
    let hrefs = hrefs(browser, waiter, locator)
        .await?
        .into_iter()
        .map(|(_, href)| href);
    Ok(select_item_links(hrefs, offset))
}

/// `/` before each of the department, category and subcategory segments.
const SEGMENT_SEPARATORS: usize = 3;

/// Keep links that reach past the listing URL, one per distinct item.
///
/// The text after `offset` (query, fragment and trailing `/` dropped) identifies the
/// item, so the image link and the title link of the same product collapse into one.
/// A link that ends before `offset` but still runs past the listing URL itself is
/// keyed from the end of the listing URL instead. Anything shorter is navigation.
pub fn select_item_links(hrefs: impl IntoIterator<Item = String>, offset: usize) -> Vec<String> {
    let listing_len = offset.saturating_sub(LINK_OFFSET_PADDING) + SEGMENT_SEPARATORS;
    let mut seen = HashSet::new();
    hrefs
        .into_iter()
        .filter(|href| {
            let path = href.split(['?', '#']).next().unwrap_or(href).trim_end_matches('/');
            let len = path.chars().count();
            let skip = if len > offset { offset } else { listing_len };
            let key: String = path.chars().skip(skip).collect();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

async fn nav_links(
    browser: &dyn Browser,
    waiter: &Waiter,
    locator: &Locator,
) -> Result<Vec<NavLink>, ScrapeError> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for (text, url) in hrefs(browser, waiter, locator).await? {
        let name = match slugify(&text) {
            n if !n.is_empty() => n,
            _ => slugify(last_segment(&url)),
        };
        if name.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        links.push(NavLink { name, url });
    }
    Ok(links)
}

/// `(text, href)` of every matching element that has an `href`.
///
/// A page where the locator never shows up yields nothing rather than an error.
async fn hrefs(
    browser: &dyn Browser,
    waiter: &Waiter,
    locator: &Locator,
) -> Result<Vec<(String, String)>, ScrapeError> {
    match waiter.wait_for(browser, locator).await {
        Ok(_) => {}
        Err(ScrapeError::WaitTimeout { .. }) => {
            warn!("Nothing matched {} on this page", locator);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    }

    let mut out = Vec::new();
    for el in browser.find_all(locator).await? {
        let Some(href) = browser.property(&el, "href").await? else {
            continue;
        };
        let text = browser.text(&el).await?;
        out.push((text, href));
    }
    Ok(out)
}

fn last_segment(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}
