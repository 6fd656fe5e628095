use serde_json::Value;
use std::time::Duration;

use crate::error::{FetchError, SheetsError};
use crate::models::{DateRange, DividendEvent, Spreadsheet, ValueInputOption, Worksheet};

pub mod google_auth;
pub mod sheets_client;
pub mod yahoo_client;

pub use google_auth::{GoogleSession, ServiceAccountKey, TokenSource};
pub use sheets_client::SheetsClient;
pub use yahoo_client::YahooClient;

/// Simple rate limiter for API requests. Zero requests per minute disables pacing.
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            0
        };

        Self { delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub async fn wait(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(self.delay()).await;
        }
    }
}

/// Source of historical dividend payouts
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DividendProvider {
    /// All dividend events for `symbol` whose ex-date falls inside `range`
    /// (both ends inclusive), oldest first.
    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<DividendEvent>, FetchError>;
}

/// The subset of a spreadsheet service the uploader needs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpreadsheetService {
    async fn open_by_key(&self, spreadsheet_id: &str) -> Result<Spreadsheet, SheetsError>;

    async fn clear(&self, worksheet: &Worksheet) -> Result<(), SheetsError>;

    async fn update(
        &self,
        worksheet: &Worksheet,
        rows: Vec<Vec<Value>>,
        input_option: ValueInputOption,
    ) -> Result<(), SheetsError>;
}
