use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::PersistenceMode;
use crate::db::Database;
use crate::error::ScrapeError;
use crate::record::{check_product_no, ProductRecord, ScrapeTarget};
use crate::store::{ObjectKeys, ObjectStore};

const JSON_CONTENT_TYPE: &str = "application/json";

/// `<root>/<department>/<category>/<subcategory>/<product_no>/{data.json,images/}`
#[derive(Debug, Clone)]
pub struct ItemPaths {
    pub images_dir: PathBuf,
    pub json_path: PathBuf,
}

impl ItemPaths {
    /// Fails when `product_no` would resolve outside `raw_root`.
    pub fn new(raw_root: &Path, target: &ScrapeTarget, product_no: &str) -> Result<Self, ScrapeError> {
        check_product_no(product_no)?;
        let item_dir = raw_root
            .join(&target.department)
            .join(&target.category)
            .join(&target.subcategory)
            .join(product_no);
        Ok(ItemPaths {
            images_dir: item_dir.join("images"),
            json_path: item_dir.join("data.json"),
        })
    }

    pub async fn create(&self) -> Result<(), ScrapeError> {
        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|e| ScrapeError::io(&self.images_dir, e))
    }
}

/// What a `persist` call actually wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub local_json: bool,
    pub cloud_json: bool,
    pub db_rows: usize,
}

impl fmt::Display for PersistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.local_json {
            parts.push("local".to_string());
        }
        if self.cloud_json {
            parts.push("cloud".to_string());
        }
        if self.db_rows > 0 {
            parts.push(format!("db:{}", self.db_rows));
        }
        if parts.is_empty() {
            f.write_str("nothing written")
        } else {
            f.write_str(&parts.join("+"))
        }
    }
}

pub struct PersistenceRouter<'a> {
    pub mode: PersistenceMode,
    pub store: &'a dyn ObjectStore,
    pub db: Option<&'a Database>,
    pub bucket: &'a str,
    pub keys: ObjectKeys,
}

impl PersistenceRouter<'_> {
    /// Write the fully enriched record to every destination `mode` selects.
    ///
    /// | mode  | local JSON | DB row | cloud JSON                |
    /// |-------|------------|--------|---------------------------|
    /// | both  | yes        | yes    | uploaded from local file  |
    /// | local | yes        | no     | no                        |
    /// | cloud | no         | no     | uploaded from memory      |
    pub async fn persist(
        &self,
        record: &ProductRecord,
        target: &ScrapeTarget,
        paths: &ItemPaths,
    ) -> Result<PersistOutcome, ScrapeError> {
        let mut outcome = PersistOutcome::default();
        let body = serde_json::to_vec_pretty(record)?;
        let key = self.keys.record_key(target, &record.product_no);

        if self.mode.writes_local() {
            tokio::fs::write(&paths.json_path, &body)
                .await
                .map_err(|e| ScrapeError::io(&paths.json_path, e))?;
            outcome.local_json = true;
            if self.mode.writes_cloud() {
                self.store
                    .upload_file(&paths.json_path, self.bucket, &key, JSON_CONTENT_TYPE)
                    .await?;
                outcome.cloud_json = true;
            }
        } else {
            self.store
                .put_object(self.bucket, &key, body, JSON_CONTENT_TYPE)
                .await?;
            outcome.cloud_json = true;
        }

        if self.mode.writes_database() {
            let db = self
                .db
                .ok_or_else(|| ScrapeError::Config("no database connection for this mode".into()))?;
            outcome.db_rows = db.upsert_product(&target.namespace(), &target.subcategory, record)?;
        }

        debug!("Persisted {}: {:?}", record.product_no, outcome);
        Ok(outcome)
    }
}
