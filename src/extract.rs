use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::browser::{find_first, read_text, Browser, Locator, Waiter};
use crate::error::ScrapeError;
use crate::record::{check_product_no, parse_price, ProductRecord};
use crate::site::Locators;

/// Vertical scroll that makes the product info tabs render.
const PANEL_SCROLL_Y: i64 = 500;

/// A collapsible section of the product page.
pub struct Panel<'a> {
    /// Heading text when the tab is selected, compared case-insensitively.
    pub label: &'static str,
    pub trigger: &'a Locator,
    pub content: &'a Locator,
}

pub struct FieldExtractor<'a> {
    browser: &'a dyn Browser,
    locators: &'a Locators,
    waiter: Waiter,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(browser: &'a dyn Browser, locators: &'a Locators, waiter: Waiter) -> Self {
        FieldExtractor {
            browser,
            locators,
            waiter,
        }
    }

    /// Read the item page currently loaded into a record without images.
    pub async fn extract(&self) -> Result<ProductRecord, ScrapeError> {
        let l = self.locators;

        let product_no_el = self.waiter.wait_for(self.browser, &l.product_no).await?;
        let product_no = self.browser.text(&product_no_el).await?.trim().to_string();
        if product_no.is_empty() {
            return Err(ScrapeError::ElementNotFound(format!(
                "{} (empty product number)",
                l.product_no
            )));
        }
        check_product_no(&product_no)?;

        let brand = read_text(self.browser, &l.brand).await?;
        let product_info = read_text(self.browser, &l.product_info).await?;

        let (_, price_el) = self
            .waiter
            .wait_for_any(self.browser, &[&l.price, &l.price_sale])
            .await?;
        let price = parse_price(&self.browser.text(&price_el).await?)?;

        self.browser.scroll_to(0, PANEL_SCROLL_Y).await?;

        let size_and_fit = self
            .try_read_panel(&Panel {
                label: "size & fit",
                trigger: &l.size_and_fit_inactive,
                content: &l.size_and_fit,
            })
            .await;
        let brand_bio = self
            .try_read_panel(&Panel {
                label: "brand bio",
                trigger: &l.brand_bio_inactive,
                content: &l.brand_bio,
            })
            .await;

        Ok(ProductRecord {
            id: Uuid::new_v4().to_string(),
            product_no,
            brand: brand.trim().to_string(),
            product_info: product_info.trim().to_string(),
            price,
            size_and_fit,
            brand_bio,
            images: Vec::new(),
            scraped_at: Utc::now(),
        })
    }

    /// Text of `panel`, opening it first if another tab is selected.
    ///
    /// Never fails: anything going wrong means the field is absent.
    pub async fn try_read_panel(&self, panel: &Panel<'_>) -> Option<String> {
        match self.read_panel(panel).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                debug!("Optional panel {:?} unavailable: {}", panel.label, e);
                None
            }
        }
    }

    async fn read_panel(&self, panel: &Panel<'_>) -> Result<String, ScrapeError> {
        if self.active_heading_is(panel.label).await {
            return read_text(self.browser, panel.content).await;
        }
        let trigger = self.waiter.wait_for(self.browser, panel.trigger).await?;
        self.browser.click(&trigger).await?;
        read_text(self.browser, panel.content).await
    }

    async fn active_heading_is(&self, label: &str) -> bool {
        let Ok(el) = find_first(self.browser, &self.locators.heading_active).await else {
            return false;
        };
        match self.browser.text(&el).await {
            Ok(text) => text.trim().to_lowercase() == label,
            Err(_) => false,
        }
    }
}
