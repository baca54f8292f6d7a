use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::ScrapeError;
use crate::record::{normalize_quotes, ProductRecord};

pub const DB_PATH: &str = "data/products.sqlite";

type Result<T> = std::result::Result<T, ScrapeError>;

/// Main connection plus one attached database per department namespace.
pub struct Database {
    conn: Connection,
    /// Directory holding `<namespace>.sqlite` files; `None` keeps namespaces in memory.
    dir: Option<PathBuf>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&dir).map_err(|e| ScrapeError::io(&dir, e))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Database { conn, dir: Some(dir) })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Database {
            conn: Connection::open_in_memory()?,
            dir: None,
        })
    }

    fn is_attached(&self, namespace: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_database_list")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names.iter().any(|n| n == namespace))
    }

    /// Attach `namespace` if it is not attached yet. Safe to call repeatedly.
    pub fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        if self.is_attached(namespace)? {
            return Ok(());
        }
        let location = match &self.dir {
            Some(dir) => dir
                .join(format!("{}.sqlite", namespace))
                .to_string_lossy()
                .into_owned(),
            None => ":memory:".to_string(),
        };
        self.conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", quote_ident(namespace)),
            params![location],
        )?;
        info!("The {} schema has been made", namespace);
        Ok(())
    }

    pub fn ensure_table(&self, namespace: &str, table: &str) -> Result<()> {
        let ns = quote_ident(namespace);
        let t = quote_ident(table);
        let idx = quote_ident(&format!("idx_{}_product_no", table));
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {ns}.{t} (
                id           TEXT PRIMARY KEY CHECK(length(id) = 36),
                product_no   TEXT NOT NULL,
                brand        TEXT,
                product_info TEXT,
                price        REAL NOT NULL,
                size_and_fit TEXT,
                brand_bio    TEXT,
                scraped_at   TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {ns}.{idx} ON {t}(product_no);
            "
        ))?;
        Ok(())
    }

    /// Insert one product, replacing the stored fields if `product_no` was seen before.
    /// The row keeps the id it was first inserted with.
    pub fn upsert_product(&self, namespace: &str, table: &str, record: &ProductRecord) -> Result<usize> {
        let sql = format!(
            "INSERT INTO {}.{} (id, product_no, brand, product_info, price, size_and_fit, brand_bio, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(product_no) DO UPDATE SET
                brand = excluded.brand,
                product_info = excluded.product_info,
                price = excluded.price,
                size_and_fit = excluded.size_and_fit,
                brand_bio = excluded.brand_bio,
                scraped_at = excluded.scraped_at",
            quote_ident(namespace),
            quote_ident(table)
        );
        let n = self.conn.execute(
            &sql,
            params![
                record.id,
                record.product_no,
                record.brand,
                normalize_quotes(&record.product_info),
                record.price,
                normalize_quotes(record.size_and_fit.as_deref().unwrap_or("")),
                normalize_quotes(record.brand_bio.as_deref().unwrap_or("")),
                record.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(n)
    }

    pub fn count_rows(&self, namespace: &str, table: &str) -> Result<usize> {
        let n: usize = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}.{}", quote_ident(namespace), quote_ident(table)),
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
