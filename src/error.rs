use std::path::PathBuf;

use thiserror::Error;

/// Problems loading configuration or the ticker catalog. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable required")]
    MissingVar(&'static str),

    #[error("{var} must be a YYYY-MM-DD date, got '{value}'")]
    InvalidDate { var: &'static str, value: String },

    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: chrono::NaiveDate, end: chrono::NaiveDate },

    #[error("failed to read ticker catalog {path}: {source}")]
    CatalogRead { path: PathBuf, source: csv::Error },

    #[error("ticker catalog line {line}: {reason}")]
    CatalogEntry { line: usize, reason: String },
}

/// Credential loading or token exchange failure. Aborts the run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read service account key {path}: {source}")]
    KeyFile { path: PathBuf, source: std::io::Error },

    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    #[error("failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint rejected credentials ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected token endpoint response: {0}")]
    MalformedResponse(String),
}

/// Per-ticker dividend query failure. The ticker is skipped, the run continues.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown symbol {symbol}: {message}")]
    UnknownSymbol { symbol: String, message: String },

    #[error("provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed provider response for {symbol}: {message}")]
    MalformedResponse { symbol: String, message: String },
}

/// Spreadsheet service failures during the upload phase.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("worksheet '{sheet_name}' not found in spreadsheet {spreadsheet_id}")]
    WorksheetNotFound {
        spreadsheet_id: String,
        sheet_name: String,
    },

    #[error("sheets API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not refresh access token: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid sheets URL: {0}")]
    Url(#[from] url::ParseError),
}
