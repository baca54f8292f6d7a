use std::path::Path;

use tracing::{debug, warn};

use crate::browser::{Browser, Locator};
use crate::config::PersistenceMode;
use crate::error::ScrapeError;
use crate::fetch::ImageFetcher;
use crate::record::{ImageDescriptor, ScrapeTarget};
use crate::store::{ObjectKeys, ObjectStore};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

pub struct ImageCollector<'a> {
    pub browser: &'a dyn Browser,
    pub fetcher: &'a dyn ImageFetcher,
    pub store: &'a dyn ObjectStore,
    pub locator: &'a Locator,
    pub mode: PersistenceMode,
    pub bucket: &'a str,
    pub keys: ObjectKeys,
}

/// Image downloaded into memory, not yet written anywhere.
pub struct FetchedImage {
    pub descriptor: ImageDescriptor,
    bytes: Vec<u8>,
}

impl ImageCollector<'_> {
    /// Enumerate the gallery of the loaded item page and download every image.
    ///
    /// Nothing is written yet, so a failed download leaves no partial item behind;
    /// the error is returned as-is.
    pub async fn fetch(&self, product_no: &str) -> Result<Vec<FetchedImage>, ScrapeError> {
        let elements = self.browser.find_all(self.locator).await?;
        let mut fetched = Vec::with_capacity(elements.len());

        for (i, el) in elements.iter().enumerate() {
            let link = match self.browser.property(el, "src").await? {
                Some(src) if !src.is_empty() => src,
                _ => {
                    warn!("Image {} of {} has no src, skipping", i + 1, product_no);
                    continue;
                }
            };
            let descriptor = ImageDescriptor::new(product_no, i + 1, link);
            let bytes = self.fetcher.fetch(&descriptor.link).await?;
            fetched.push(FetchedImage { descriptor, bytes });
        }

        Ok(fetched)
    }

    /// Route fetched images to disk and/or the object store per `mode`.
    pub async fn store(
        &self,
        target: &ScrapeTarget,
        fetched: Vec<FetchedImage>,
        images_dir: &Path,
    ) -> Result<Vec<ImageDescriptor>, ScrapeError> {
        let mut images = Vec::with_capacity(fetched.len());
        for FetchedImage { descriptor, bytes } in fetched {
            let key = self.keys.image_key(target, &descriptor.image_no);

            if self.mode.writes_local() {
                let path = images_dir.join(format!("{}.jpg", descriptor.image_no));
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| ScrapeError::io(&path, e))?;
                if self.mode.writes_cloud() {
                    self.store
                        .upload_file(&path, self.bucket, &key, IMAGE_CONTENT_TYPE)
                        .await?;
                }
            } else {
                self.store
                    .put_object(self.bucket, &key, bytes, IMAGE_CONTENT_TYPE)
                    .await?;
            }
            debug!("Stored image {}", descriptor.image_no);
            images.push(descriptor);
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_site, FakeBrowser, FakeElement, FakeFetcher, FakePage, MemoryStore};

    const URL: &str = "https://shop.test/item";

    fn target() -> ScrapeTarget {
        ScrapeTarget {
            department: "men".into(),
            category: "clothing".into(),
            subcategory: "shirts".into(),
            listing_url: "https://shop.test/men/clothing/shirts".into(),
        }
    }

    fn gallery_browser(locator: &Locator) -> FakeBrowser {
        let page = FakePage::new().with(
            locator.as_str(),
            vec![
                FakeElement::image("https://cdn.test/a.jpg"),
                FakeElement::image("https://cdn.test/b.jpg"),
                FakeElement::image("https://cdn.test/c.jpg"),
            ],
        );
        FakeBrowser::new().page(URL, page)
    }

    async fn run(
        mode: PersistenceMode,
        fetcher: &FakeFetcher,
        store: &MemoryStore,
        dir: &Path,
    ) -> Result<Vec<ImageDescriptor>, ScrapeError> {
        let site = fixture_site();
        let browser = gallery_browser(&site.locators.images);
        browser.navigate(URL).await.unwrap();
        let collector = ImageCollector {
            browser: &browser,
            fetcher,
            store,
            locator: &site.locators.images,
            mode,
            bucket: "bucket",
            keys: ObjectKeys { prefixed: false },
        };
        let fetched = collector.fetch("1001").await?;
        collector.store(&target(), fetched, dir).await
    }

    #[tokio::test]
    async fn both_mode_writes_and_uploads_every_image() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new();
        let store = MemoryStore::new();
        let images = run(PersistenceMode::Both, &fetcher, &store, tmp.path()).await.unwrap();

        let numbers: Vec<&str> = images.iter().map(|i| i.image_no.as_str()).collect();
        assert_eq!(numbers, ["1001_1", "1001_2", "1001_3"]);
        assert_eq!(images[1].link, "https://cdn.test/b.jpg");
        for n in 1..=3 {
            assert!(tmp.path().join(format!("1001_{}.jpg", n)).exists());
        }
        assert_eq!(store.keys(), ["1001_1.jpg", "1001_2.jpg", "1001_3.jpg"]);
        assert_eq!(
            store.get("1001_3.jpg").unwrap(),
            b"jpeg:https://cdn.test/c.jpg"
        );
    }

    #[tokio::test]
    async fn local_only_never_touches_store() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new();
        let store = MemoryStore::new();
        let images = run(PersistenceMode::LocalOnly, &fetcher, &store, tmp.path()).await.unwrap();

        assert_eq!(images.len(), 3);
        assert!(store.keys().is_empty());
        assert_eq!(fetcher.fetched().len(), 3);
    }

    #[tokio::test]
    async fn cloud_only_uploads_bytes_without_local_files() {
        let tmp = tempfile::tempdir().unwrap();
        let images_dir = tmp.path().join("never-created");
        let fetcher = FakeFetcher::new();
        let store = MemoryStore::new();
        let images = run(PersistenceMode::CloudOnly, &fetcher, &store, &images_dir).await.unwrap();

        assert_eq!(images.len(), 3);
        assert_eq!(store.keys().len(), 3);
        assert!(!images_dir.exists());
    }

    #[tokio::test]
    async fn failed_download_stores_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new().failing_on("https://cdn.test/b.jpg");
        let store = MemoryStore::new();
        let err = run(PersistenceMode::Both, &fetcher, &store, tmp.path()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Network { .. }));
        assert_eq!(fetcher.fetched(), ["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]);
        assert!(store.keys().is_empty());
        assert!(!tmp.path().join("1001_1.jpg").exists());
    }

    #[tokio::test]
    async fn images_without_src_keep_their_position() {
        let site = fixture_site();
        let page = FakePage::new().with(
            site.locators.images.as_str(),
            vec![FakeElement::default(), FakeElement::image("https://cdn.test/b.jpg")],
        );
        let browser = FakeBrowser::new().page(URL, page);
        browser.navigate(URL).await.unwrap();
        let fetcher = FakeFetcher::new();
        let store = MemoryStore::new();
        let collector = ImageCollector {
            browser: &browser,
            fetcher: &fetcher,
            store: &store,
            locator: &site.locators.images,
            mode: PersistenceMode::CloudOnly,
            bucket: "bucket",
            keys: ObjectKeys { prefixed: false },
        };
        let fetched = collector.fetch("9").await.unwrap();
        let images = collector.store(&target(), fetched, Path::new("unused")).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_no, "9_2");
    }
}
