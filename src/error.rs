use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {:.1}s waiting for {what}", waited.as_secs_f64())]
    WaitTimeout { what: String, waited: Duration },

    #[error("webdriver {command} failed: {message}")]
    Browser { command: String, message: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("object store rejected {key}: {message}")]
    Store { key: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse price from {0:?}")]
    InvalidPrice(String),

    #[error("product number {0:?} is not usable as a file or object name")]
    InvalidProductNo(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse grouping used for log fields and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Extraction,
    Browser,
    Network,
    Persistence,
    Config,
}

impl ScrapeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn network(url: &str, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ScrapeError::Network {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::ElementNotFound(_)
            | ScrapeError::WaitTimeout { .. }
            | ScrapeError::InvalidPrice(_)
            | ScrapeError::InvalidProductNo(_) => ErrorKind::Extraction,
            ScrapeError::Browser { .. } => ErrorKind::Browser,
            ScrapeError::Network { .. } => ErrorKind::Network,
            ScrapeError::Store { .. }
            | ScrapeError::Database(_)
            | ScrapeError::Io { .. }
            | ScrapeError::Json(_) => ErrorKind::Persistence,
            ScrapeError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::Extraction => 3,
            ErrorKind::Browser => 4,
            ErrorKind::Network => 5,
            ErrorKind::Persistence => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::Browser => "browser",
            ErrorKind::Network => "network",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}
