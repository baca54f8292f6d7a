pub mod webdriver;

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ScrapeError;

/// An XPath expression locating zero or more elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to an element on the page that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// What the scraper needs from a browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    /// All elements matching `locator`, in document order. Empty when none match.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, ScrapeError>;

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError>;

    /// DOM property (not attribute), so `href`/`src` come back absolute.
    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>, ScrapeError>;

    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError>;

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), ScrapeError>;

    async fn close(&self) -> Result<(), ScrapeError>;
}

pub async fn find_first(browser: &dyn Browser, locator: &Locator) -> Result<ElementRef, ScrapeError> {
    browser
        .find_all(locator)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::ElementNotFound(locator.to_string()))
}

pub async fn read_text(browser: &dyn Browser, locator: &Locator) -> Result<String, ScrapeError> {
    let el = find_first(browser, locator).await?;
    browser.text(&el).await
}

/// Blocking-style polls bounded by a timeout.
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Waiter {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Waiter { timeout, poll }
    }

    pub async fn wait_for(
        &self,
        browser: &dyn Browser,
        locator: &Locator,
    ) -> Result<ElementRef, ScrapeError> {
        self.wait_for_any(browser, &[locator]).await.map(|(_, el)| el)
    }

    /// Poll every locator in turn until one matches; returns its index and first element.
    ///
    /// Earlier locators win ties within the same poll round.
    pub async fn wait_for_any(
        &self,
        browser: &dyn Browser,
        locators: &[&Locator],
    ) -> Result<(usize, ElementRef), ScrapeError> {
        let start = Instant::now();
        loop {
            for (i, loc) in locators.iter().enumerate() {
                if let Some(el) = browser.find_all(loc).await?.into_iter().next() {
                    return Ok((i, el));
                }
            }
            let waited = start.elapsed();
            if waited >= self.timeout {
                let what = locators
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ");
                return Err(ScrapeError::WaitTimeout { what, waited });
            }
            tokio::time::sleep(self.poll.min(self.timeout - waited)).await;
        }
    }
}
