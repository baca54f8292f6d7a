use async_trait::async_trait;
use reqwest::Client;

use crate::error::ScrapeError;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScrapeError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeError::network(url, e))?;
        let bytes = resp.bytes().await.map_err(|e| ScrapeError::network(url, e))?;
        Ok(bytes.to_vec())
    }
}
