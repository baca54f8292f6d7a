use tracing::{info, warn};

use crate::browser::{Browser, Locator, Waiter};
use crate::error::ScrapeError;
use crate::site::SiteProfile;

/// Load the storefront, accept cookies and close the promotion modal.
///
/// Only navigation failures are fatal; either overlay may simply not appear.
pub async fn dismiss_overlays(browser: &dyn Browser, site: &SiteProfile, waiter: &Waiter) -> Result<(), ScrapeError> {
    browser.navigate(&site.root).await?;
    click_if_shown(browser, waiter, &site.locators.cookie_accept, "cookie banner").await;
    click_if_shown(browser, waiter, &site.locators.promotion_close, "promotion").await;
    Ok(())
}

async fn click_if_shown(browser: &dyn Browser, waiter: &Waiter, locator: &Locator, what: &str) {
    let el = match waiter.wait_for(browser, locator).await {
        Ok(el) => el,
        Err(e) => {
            info!("No {} to dismiss ({})", what, e);
            return;
        }
    };
    match browser.click(&el).await {
        Ok(()) => info!("Dismissed {}", what),
        Err(e) => warn!("Could not dismiss {}: {}", what, e),
    }
}
