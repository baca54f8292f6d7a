use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::browser::{Browser, Waiter};
use crate::config::{Config, Department};
use crate::db::Database;
use crate::discover;
use crate::error::{ErrorKind, ScrapeError};
use crate::extract::FieldExtractor;
use crate::fetch::ImageFetcher;
use crate::images::ImageCollector;
use crate::overlays::dismiss_overlays;
use crate::persist::{ItemPaths, PersistOutcome, PersistenceRouter};
use crate::record::{ProductRecord, ScrapeTarget};
use crate::site::{listing_link_offset, slugify, SiteProfile};
use crate::store::{ObjectKeys, ObjectStore};

/// Per-subcategory outcome, kept for the run summary.
#[derive(Debug, Clone)]
pub struct SubcategoryReport {
    pub target: ScrapeTarget,
    pub discovered: usize,
    pub ok: usize,
    pub failed: usize,
    /// Rows in the subcategory table afterwards, when rows are written.
    pub stored_rows: Option<usize>,
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub departments: Vec<Department>,
    pub subcategories: Vec<SubcategoryReport>,
    pub last_failure: Option<ErrorKind>,
}

impl RunStats {
    pub fn items_ok(&self) -> usize {
        self.subcategories.iter().map(|s| s.ok).sum()
    }

    pub fn items_failed(&self) -> usize {
        self.subcategories.iter().map(|s| s.failed).sum()
    }
}

/// Walks departments → categories → subcategories → items, one at a time.
pub struct Traversal<'a> {
    pub browser: &'a dyn Browser,
    pub fetcher: &'a dyn ImageFetcher,
    pub store: &'a dyn ObjectStore,
    pub db: Option<&'a Database>,
    pub config: &'a Config,
    pub site: &'a SiteProfile,
}

impl<'a> Traversal<'a> {
    fn waiter(&self) -> Waiter {
        Waiter::new(self.config.delay, self.config.poll_interval)
    }

    fn keys(&self) -> ObjectKeys {
        ObjectKeys {
            prefixed: self.config.prefix_keys,
        }
    }

    fn database(&self) -> Result<&'a Database, ScrapeError> {
        self.db
            .ok_or_else(|| ScrapeError::Config("no database connection for this mode".into()))
    }

    pub async fn run(&self) -> Result<RunStats, ScrapeError> {
        dismiss_overlays(self.browser, self.site, &self.waiter()).await?;

        let mut stats = RunStats::default();
        for department in self.config.departments.departments() {
            self.scrape_department(department, &mut stats).await?;
            stats.departments.push(department);
            info!("{} department has been scraped", department);
        }
        Ok(stats)
    }

    async fn scrape_department(&self, department: Department, stats: &mut RunStats) -> Result<(), ScrapeError> {
        if self.config.mode.prepares_schema() {
            let namespace = format!("{}_data", slugify(self.site.department_path(department)));
            self.database()?.ensure_namespace(&namespace)?;
        }

        let waiter = self.waiter();
        let categories = discover::categories(self.browser, self.site, &waiter, department).await?;
        let targets =
            discover::subcategory_targets(self.browser, self.site, &waiter, department, &categories)
                .await?;

        for target in &targets {
            let report = self.scrape_subcategory(target, stats).await?;
            stats.subcategories.push(report);
        }
        Ok(())
    }

    /// Scrape up to `max_items` items of one subcategory listing, in listing order.
    pub async fn scrape_subcategory(
        &self,
        target: &ScrapeTarget,
        stats: &mut RunStats,
    ) -> Result<SubcategoryReport, ScrapeError> {
        self.browser.navigate(&target.listing_url).await?;
        let offset = listing_link_offset(&self.site.root, &target.listing_url);
        let links = discover::item_links(
            self.browser,
            &self.waiter(),
            &self.site.locators.item_link,
            offset,
        )
        .await?;
        let max_items = self.config.max_items.min(links.len());

        if self.config.mode.prepares_schema() {
            self.database()?
                .ensure_table(&target.namespace(), &target.subcategory)?;
        }

        let mut report = SubcategoryReport {
            target: target.clone(),
            discovered: links.len(),
            ok: 0,
            failed: 0,
            stored_rows: None,
        };

        let pb = ProgressBar::new(max_items as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(target.subcategory.clone());

        for link in links.iter().take(max_items) {
            match self.scrape_item(target, link).await {
                Ok((record, outcome)) => {
                    report.ok += 1;
                    pb.println(format!("  {} {} -> {}", record.product_no, record.brand, outcome));
                }
                Err(e) if self.config.fail_fast => {
                    pb.finish_and_clear();
                    return Err(e);
                }
                Err(e) => {
                    warn!(link = %link, kind = %e.kind(), "Item failed: {}", e);
                    report.failed += 1;
                    stats.last_failure = Some(e.kind());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if self.config.mode.writes_database() {
            report.stored_rows = Some(
                self.database()?
                    .count_rows(&target.namespace(), &target.subcategory)?,
            );
        }

        info!(
            "{} links in the {}'s department have been retrieved ({} ok, {} failed)",
            target.subcategory, target.department, report.ok, report.failed
        );
        Ok(report)
    }

    async fn scrape_item(
        &self,
        target: &ScrapeTarget,
        link: &str,
    ) -> Result<(ProductRecord, PersistOutcome), ScrapeError> {
        self.browser.navigate(link).await?;

        let mut record = FieldExtractor::new(self.browser, &self.site.locators, self.waiter())
            .extract()
            .await?;
        let paths = ItemPaths::new(&self.config.raw_data_root, target, &record.product_no)?;

        let collector = ImageCollector {
            browser: self.browser,
            fetcher: self.fetcher,
            store: self.store,
            locator: &self.site.locators.images,
            mode: self.config.mode,
            bucket: &self.config.bucket,
            keys: self.keys(),
        };
        let fetched = collector.fetch(&record.product_no).await?;

        if self.config.mode.writes_local() {
            paths.create().await?;
        }
        record.images = collector.store(target, fetched, &paths.images_dir).await?;

        let router = PersistenceRouter {
            mode: self.config.mode,
            store: self.store,
            db: self.db,
            bucket: &self.config.bucket,
            keys: self.keys(),
        };
        let outcome = router.persist(&record, target, &paths).await?;
        Ok((record, outcome))
    }
}
