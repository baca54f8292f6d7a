//! In-memory stand-ins for the browser, image fetcher and object store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::browser::{Browser, ElementRef, Locator};
use crate::error::ScrapeError;
use crate::fetch::ImageFetcher;
use crate::site::SiteProfile;
use crate::store::ObjectStore;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    props: HashMap<String, String>,
    reveals: Vec<(String, Vec<FakeElement>)>,
}

impl FakeElement {
    pub fn text(text: &str) -> Self {
        FakeElement {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn link(text: &str, href: &str) -> Self {
        FakeElement::text(text).prop("href", href)
    }

    pub fn image(src: &str) -> Self {
        FakeElement::default().prop("src", src)
    }

    pub fn prop(mut self, name: &str, value: &str) -> Self {
        self.props.insert(name.to_string(), value.to_string());
        self
    }

    /// Clicking this element replaces `locator`'s matches on the live page.
    pub fn reveals(mut self, locator: &str, elements: Vec<FakeElement>) -> Self {
        self.reveals.push((locator.to_string(), elements));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(locator.to_string(), elements);
        self
    }
}

#[derive(Default)]
struct State {
    live: HashMap<String, Vec<FakeElement>>,
    handles: Vec<FakeElement>,
    visited: Vec<String>,
    clicks: usize,
    scrolls: usize,
}

#[derive(Default)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    state: Mutex<State>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    fn handle(&self, element: &ElementRef) -> Result<FakeElement, ScrapeError> {
        let state = self.state.lock().unwrap();
        element
            .0
            .parse::<usize>()
            .ok()
            .and_then(|i| state.handles.get(i).cloned())
            .ok_or_else(|| ScrapeError::ElementNotFound(format!("stale handle {}", element.0)))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let mut state = self.state.lock().unwrap();
        state.visited.push(url.to_string());
        state.live = self
            .pages
            .get(url)
            .map(|p| p.elements.clone())
            .unwrap_or_default();
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, ScrapeError> {
        let mut state = self.state.lock().unwrap();
        let found = state.live.get(locator.as_str()).cloned().unwrap_or_default();
        let mut refs = Vec::with_capacity(found.len());
        for el in found {
            refs.push(ElementRef(state.handles.len().to_string()));
            state.handles.push(el);
        }
        Ok(refs)
    }

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError> {
        Ok(self.handle(element)?.text)
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self.handle(element)?.props.get(name).cloned())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError> {
        let el = self.handle(element)?;
        let mut state = self.state.lock().unwrap();
        state.clicks += 1;
        for (loc, revealed) in el.reveals {
            state.live.insert(loc, revealed);
        }
        Ok(())
    }

    async fn scroll_to(&self, _x: i64, _y: i64) -> Result<(), ScrapeError> {
        self.state.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(ScrapeError::network(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            ));
        }
        Ok(format!("jpeg:{}", url).into_bytes())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<(String, String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(_, key, _)| key.clone())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(_, k, _)| k == key)
            .map(|(_, _, body)| body.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ScrapeError> {
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body));
        Ok(())
    }
}

/// Site profile whose locators are short symbolic names.
pub fn fixture_site() -> SiteProfile {
    SiteProfile::parse(
        r#"
root = "https://shop.test"

[departments]
men = "men"
women = "women"
kids = "kids"

[locators]
cookie_accept = "cookie-accept"
promotion_close = "promotion-close"
category = "category"
subcategory = "subcategory"
item_link = "item-link"
product_no = "product-no"
brand = "brand"
product_info = "product-info"
price = "price"
price_sale = "price-sale"
heading_active = "heading-active"
size_and_fit_inactive = "size-and-fit-inactive"
size_and_fit = "size-and-fit"
brand_bio_inactive = "brand-bio-inactive"
brand_bio = "brand-bio"
images = "images"
"#,
    )
    .unwrap()
}
