use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SheetsError};

/// Column names written as the first row of the worksheet
pub const HEADER_ROW: [&str; 3] = ["Ticker", "Ex-Dividend Date", "Dividend Amount"];

pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://spreadsheets.google.com/feeds",
    "https://www.googleapis.com/auth/drive",
];

/// One row of the ticker catalog: the symbol the provider is queried with and
/// the exchange-qualified symbol shown in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerEntry {
    pub symbol: String,
    pub display_symbol: String,
}

impl TickerEntry {
    pub fn new(symbol: impl Into<String>, display_symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_symbol: display_symbol.into(),
        }
    }
}

/// Ordered, duplicate-free list of tickers to process
#[derive(Debug, Clone, PartialEq)]
pub struct TickerCatalog {
    entries: Vec<TickerEntry>,
}

impl TickerCatalog {
    /// Validate entries in order. An empty catalog is allowed; it simply
    /// produces no records.
    pub fn new(entries: Vec<TickerEntry>) -> Result<Self, ConfigError> {
        Self::from_numbered(entries.into_iter().enumerate().map(|(i, e)| (i + 1, e)))
    }

    /// Load a catalog from a CSV file with a `symbol,display_symbol` header
    pub fn from_csv_path(path: &Path) -> Result<Self, ConfigError> {
        let reader = std::fs::File::open(path).map_err(|e| ConfigError::CatalogRead {
            path: path.to_path_buf(),
            source: csv::Error::from(e),
        })?;
        Self::from_reader(reader)
    }

    /// Parse CSV catalog data. Lines starting with `#` are comments.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| ConfigError::CatalogEntry {
                line: 1,
                reason: e.to_string(),
            })?
            .clone();

        let mut numbered = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| ConfigError::CatalogEntry {
                line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                reason: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            let entry: TickerEntry =
                record
                    .deserialize(Some(&headers))
                    .map_err(|e| ConfigError::CatalogEntry {
                        line,
                        reason: e.to_string(),
                    })?;
            numbered.push((line, entry));
        }

        Self::from_numbered(numbered)
    }

    /// Shared checks; `line` is whatever position the caller reports errors at
    fn from_numbered<I>(numbered: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (usize, TickerEntry)>,
    {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (line, entry) in numbered {
            if entry.symbol.is_empty() || entry.display_symbol.is_empty() {
                return Err(ConfigError::CatalogEntry {
                    line,
                    reason: "symbol and display_symbol must both be set".to_string(),
                });
            }
            if !seen.insert(entry.symbol.clone()) {
                return Err(ConfigError::CatalogEntry {
                    line,
                    reason: format!("duplicate symbol {}", entry.symbol),
                });
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TickerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TickerEntry> {
        self.entries.iter()
    }
}

/// Inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A single dividend payout as reported by the market-data provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub amount: f64,
}

/// One row of the output table
#[derive(Debug, Clone, PartialEq)]
pub struct DividendRecord {
    pub display_symbol: String,
    pub ex_dividend_date: NaiveDate,
    pub amount: f64,
}

impl DividendRecord {
    pub fn from_event(entry: &TickerEntry, event: &DividendEvent) -> Self {
        Self {
            display_symbol: entry.display_symbol.clone(),
            ex_dividend_date: event.date,
            amount: event.amount,
        }
    }

    /// Sheet row in header order. The date is written as an ISO string and
    /// the amount as a JSON number so the sheet can coerce it.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::String(self.display_symbol.clone()),
            Value::String(self.ex_dividend_date.format("%Y-%m-%d").to_string()),
            serde_json::json!(self.amount),
        ]
    }
}

pub fn header_row() -> Vec<Value> {
    HEADER_ROW
        .iter()
        .map(|name| Value::String(name.to_string()))
        .collect()
}

/// Where the table is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

/// How the spreadsheet interprets written values. Only user-entered
/// semantics are written, so number-like cells get coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputOption {
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// A single tab of a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub title: String,
}

/// An opened spreadsheet and the tabs it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub spreadsheet_id: String,
    pub title: String,
    pub worksheets: Vec<Worksheet>,
}

impl Spreadsheet {
    /// Look up a tab by its exact title
    pub fn worksheet(&self, title: &str) -> Result<Worksheet, SheetsError> {
        self.worksheets
            .iter()
            .find(|w| w.title == title)
            .cloned()
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                spreadsheet_id: self.spreadsheet_id.clone(),
                sheet_name: title.to_string(),
            })
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub scopes: Vec<String>,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub ticker_catalog_path: PathBuf,
    pub date_range: DateRange,
    pub yahoo_base_url: String,
    pub sheets_base_url: String,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(&HashMap::new())
    }

    /// Load configuration from environment variables, letting `overrides`
    /// (keyed by variable name) take precedence
    pub fn from_env_with(overrides: &HashMap<&str, String>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let today = chrono::Local::now().date_naive();
        Self::from_vars(
            |key| overrides.get(key).cloned().or_else(|| std::env::var(key).ok()),
            today,
        )
    }

    /// Build configuration from an arbitrary variable source. `today` is the
    /// default end of the date window.
    pub fn from_vars<F>(lookup: F, today: NaiveDate) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let start = match var("START_DATE") {
            Some(value) => parse_date("START_DATE", &value)?,
            None => NaiveDate::from_ymd_opt(2024, 1, 1).ok_or(ConfigError::InvalidDate {
                var: "START_DATE",
                value: "2024-01-01".to_string(),
            })?,
        };
        let end = match var("END_DATE") {
            Some(value) => parse_date("END_DATE", &value)?,
            None => today,
        };

        let scopes = match var("GOOGLE_SCOPES") {
            Some(value) => value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        let rate_limit_per_minute = match var("RATE_LIMIT_PER_MINUTE") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "RATE_LIMIT_PER_MINUTE",
                    value,
                })?,
            None => 120,
        };

        Ok(Config {
            credentials_path: var("GOOGLE_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .ok_or(ConfigError::MissingVar("GOOGLE_CREDENTIALS_PATH"))?,
            scopes,
            spreadsheet_id: var("SPREADSHEET_ID").ok_or(ConfigError::MissingVar("SPREADSHEET_ID"))?,
            sheet_name: var("SHEET_NAME").unwrap_or_else(|| "Dividend Amount".to_string()),
            ticker_catalog_path: var("TICKER_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tickers.csv")),
            date_range: DateRange::new(start, end)?,
            yahoo_base_url: var("YAHOO_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            sheets_base_url: var("SHEETS_BASE_URL")
                .unwrap_or_else(|| "https://sheets.googleapis.com".to_string()),
            rate_limit_per_minute,
        })
    }

    pub fn sheet_target(&self) -> SheetTarget {
        SheetTarget {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_name: self.sheet_name.clone(),
        }
    }
}

fn parse_date(var: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        var,
        value: value.to_string(),
    })
}
