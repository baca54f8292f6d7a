use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::ScrapeError;
use crate::record::ScrapeTarget;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ScrapeError>;

    /// Upload a file already written to local disk.
    async fn upload_file(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<(), ScrapeError> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| ScrapeError::io(path, e))?;
        self.put_object(bucket, key, body, content_type).await
    }
}

/// S3-compatible gateway reached with plain `PUT {endpoint}/{bucket}/{key}`.
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        HttpObjectStore {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ScrapeError> {
        let url = format!("{}/{}/{}", self.endpoint, bucket, key);
        debug!("PUT {} ({} bytes)", url, body.len());
        let mut req = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| ScrapeError::network(&url, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::Store {
                key: format!("{}/{}", bucket, key),
                message: format!("{} {}", status, text.trim()),
            });
        }
        Ok(())
    }
}

/// Mirrors the bucket layout under a local directory.
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirObjectStore { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for DirObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ScrapeError> {
        let path = self.root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::io(parent, e))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| ScrapeError::io(&path, e))
    }
}

/// Object key layout: flat by default, or prefixed with the target's taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct ObjectKeys {
    pub prefixed: bool,
}

impl ObjectKeys {
    pub fn record_key(&self, target: &ScrapeTarget, product_no: &str) -> String {
        self.key(target, &format!("{}.json", product_no))
    }

    pub fn image_key(&self, target: &ScrapeTarget, image_no: &str) -> String {
        self.key(target, &format!("{}.jpg", image_no))
    }

    fn key(&self, target: &ScrapeTarget, name: &str) -> String {
        if self.prefixed {
            format!(
                "{}/{}/{}/{}",
                target.department, target.category, target.subcategory, name
            )
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ScrapeTarget {
        ScrapeTarget {
            department: "kids".into(),
            category: "baby".into(),
            subcategory: "bodysuits".into(),
            listing_url: "https://shop.test/kids/baby/bodysuits".into(),
        }
    }

    #[test]
    fn flat_keys_use_product_and_image_numbers() {
        let keys = ObjectKeys { prefixed: false };
        assert_eq!(keys.record_key(&target(), "1234"), "1234.json");
        assert_eq!(keys.image_key(&target(), "1234_2"), "1234_2.jpg");
    }

    #[test]
    fn prefixed_keys_carry_taxonomy() {
        let keys = ObjectKeys { prefixed: true };
        assert_eq!(
            keys.record_key(&target(), "1234"),
            "kids/baby/bodysuits/1234.json"
        );
    }

    #[tokio::test]
    async fn dir_store_writes_under_bucket() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirObjectStore::new(tmp.path());
        store
            .put_object("bucket", "kids/baby/x.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();
        let written = std::fs::read(tmp.path().join("bucket/kids/baby/x.json")).unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn upload_file_reads_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("data.json");
        std::fs::write(&src, b"{\"a\":1}").unwrap();
        let store = DirObjectStore::new(tmp.path().join("mirror"));
        store
            .upload_file(&src, "b", "1.json", "application/json")
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(tmp.path().join("mirror/b/1.json")).unwrap(),
            b"{\"a\":1}"
        );
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirObjectStore::new(tmp.path());
        let err = store
            .upload_file(&tmp.path().join("nope.jpg"), "b", "k", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Io { .. }));
    }
}
