//! Error types for the stock grid adapter

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Timed out after {waited_ms} ms waiting for {locator} to be {condition}")]
    SyncTimeout {
        locator: String,
        condition: String,
        waited_ms: u64,
    },

    #[error("{0} was not found as a column in the stock table")]
    UnknownColumn(String),

    #[error("{0} was not found as a status option")]
    InvalidStatus(String),

    #[error("Row {row} is out of range (grid has {count} rows)")]
    RowOutOfRange { row: usize, count: usize },

    #[error("No integer in text of {locator}: {text:?}")]
    NotANumber { locator: String, text: String },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GridError {
    pub(crate) fn timeout(locator: impl ToString, condition: impl ToString, waited_ms: u64) -> Self {
        GridError::SyncTimeout {
            locator: locator.to_string(),
            condition: condition.to_string(),
            waited_ms,
        }
    }

    /// Whether this error is a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(self, GridError::SyncTimeout { .. })
    }
}

pub type GridResult<T> = Result<T, GridError>;
