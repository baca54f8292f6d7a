mod browser;
mod config;
mod db;
mod discover;
mod error;
mod extract;
mod fetch;
mod images;
mod overlays;
mod persist;
mod record;
mod site;
mod store;
mod traversal;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use crate::browser::webdriver::WebDriverSession;
use crate::browser::Browser;
use crate::config::{Config, DepartmentFilter, PersistenceMode, DEFAULT_MAX_ITEMS};
use crate::db::Database;
use crate::error::ScrapeError;
use crate::fetch::HttpFetcher;
use crate::site::SiteProfile;
use crate::store::{DirObjectStore, HttpObjectStore, ObjectStore};
use crate::traversal::{RunStats, Traversal};

#[derive(Parser)]
#[command(
    name = "retail_scraper",
    about = "Scrape products from a retail site's department/category/subcategory tree"
)]
struct Cli {
    /// Scrape only the Mens department
    #[arg(short = 'm', long)]
    men: bool,
    /// Scrape only the Womens department
    #[arg(short = 'w', long)]
    women: bool,
    /// Scrape only the Kids department
    #[arg(short = 'k', long)]
    kids: bool,
    /// Save scraped data on the local machine only
    #[arg(short = 'l', long)]
    locally: bool,
    /// Upload data to object storage only
    #[arg(short = 'c', long)]
    cloud: bool,

    /// Items scraped per subcategory
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_ITEMS)]
    max_items: usize,
    /// Site profile (TOML); the bundled profile is used when omitted
    #[arg(long)]
    site: Option<PathBuf>,
    /// WebDriver server (chromedriver, geckodriver, Selenium)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    webdriver: String,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Root of the local raw data tree
    #[arg(long, default_value = "data/raw_data")]
    data_dir: PathBuf,
    /// Main SQLite database; department namespaces are attached next to it
    #[arg(long, default_value = db::DB_PATH)]
    db: PathBuf,
    #[arg(long, env = "SCRAPER_BUCKET", default_value = "retail-scraper")]
    bucket: String,
    /// S3-compatible endpoint taking `PUT {endpoint}/{bucket}/{key}`
    #[arg(long, env = "OBJECT_STORE_ENDPOINT")]
    store_endpoint: Option<String>,
    #[arg(long, env = "OBJECT_STORE_TOKEN", hide_env_values = true)]
    store_token: Option<String>,
    /// Local bucket mirror used when no endpoint is configured
    #[arg(long, default_value = "data/object_store")]
    store_dir: PathBuf,
    /// Prefix object keys with department/category/subcategory
    #[arg(long)]
    prefix_keys: bool,
    /// Seconds to wait for an element before giving up
    #[arg(long, default_value_t = 10)]
    delay: u64,
    /// Abort on the first failed item instead of moving on
    #[arg(long)]
    fail_fast: bool,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            departments: DepartmentFilter::from_flags(self.men, self.women, self.kids),
            mode: PersistenceMode::from_flags(self.locally, self.cloud),
            max_items: self.max_items,
            raw_data_root: self.data_dir.clone(),
            bucket: self.bucket.clone(),
            prefix_keys: self.prefix_keys,
            delay: Duration::from_secs(self.delay),
            fail_fast: self.fail_fast,
            ..Config::default()
        }
    }

    fn object_store(&self) -> Box<dyn ObjectStore> {
        match &self.store_endpoint {
            Some(endpoint) => Box::new(HttpObjectStore::new(endpoint, self.store_token.clone())),
            None => Box::new(DirObjectStore::new(&self.store_dir)),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let code = match run(&cli).await {
        Ok(stats) => {
            print_summary(&stats);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    code
}

async fn run(cli: &Cli) -> anyhow::Result<RunStats> {
    let config = cli.to_config();
    let site = SiteProfile::load(cli.site.as_deref())
        .map_err(|e| ScrapeError::Config(format!("{:#}", e)))?;

    info!("{}", config.departments.describe());
    info!("{}", config.mode.describe());

    let db = if config.mode.prepares_schema() {
        Some(Database::open(&cli.db).with_context(|| format!("Failed to open {}", cli.db.display()))?)
    } else {
        None
    };
    let store = cli.object_store();
    if config.mode.writes_cloud() && cli.store_endpoint.is_none() {
        warn!(
            "No object store endpoint set; mirroring uploads under {}",
            cli.store_dir.display()
        );
    }
    let fetcher = HttpFetcher::new();

    let session = WebDriverSession::connect(&cli.webdriver, !cli.headed).await?;
    let traversal = Traversal {
        browser: &session,
        fetcher: &fetcher,
        store: store.as_ref(),
        db: db.as_ref(),
        config: &config,
        site: &site,
    };
    let result = traversal.run().await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    Ok(result?)
}

/// Distinct codes for each fatal error kind; 1 for anything else.
fn exit_code(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<ScrapeError>())
        .map(ScrapeError::exit_code)
        .unwrap_or(1)
}

fn print_summary(stats: &RunStats) {
    println!(
        "{:<8} | {:<20} | {:<24} | {:>5} | {:>3} | {:>6} | {:>5}",
        "Dept", "Category", "Subcategory", "Links", "OK", "Failed", "Rows"
    );
    println!("{}", "-".repeat(88));
    for r in &stats.subcategories {
        let rows = r.stored_rows.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<8} | {:<20} | {:<24} | {:>5} | {:>3} | {:>6} | {:>5}",
            truncate(&r.target.department, 8),
            truncate(&r.target.category, 20),
            truncate(&r.target.subcategory, 24),
            r.discovered,
            r.ok,
            r.failed,
            rows
        );
    }
    println!(
        "\n{} departments | {} subcategories | {} items scraped, {} failed",
        stats.departments.len(),
        stats.subcategories.len(),
        stats.items_ok(),
        stats.items_failed()
    );
    if let Some(kind) = stats.last_failure {
        println!("Last item failure was a {} error; see the log for links.", kind);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_map_to_config() {
        let cli = Cli::parse_from(["retail_scraper", "-w", "-l", "-n", "5"]);
        let cfg = cli.to_config();
        assert_eq!(cfg.departments, DepartmentFilter::Only(config::Department::Women));
        assert_eq!(cfg.mode, PersistenceMode::LocalOnly);
        assert_eq!(cfg.max_items, 5);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["retail_scraper"]);
        let cfg = cli.to_config();
        assert_eq!(cfg.departments, DepartmentFilter::All);
        assert_eq!(cfg.mode, PersistenceMode::Both);
        assert_eq!(cfg.max_items, 3);
        assert_eq!(cfg.delay, Duration::from_secs(10));
    }

    #[test]
    fn exit_code_follows_scrape_error_kind() {
        let e = anyhow::Error::new(ScrapeError::Config("x".into())).context("while starting");
        assert_eq!(exit_code(&e), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn truncate_keeps_width() {
        assert_eq!(truncate("shirts", 24), "shirts");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
