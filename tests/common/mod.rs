//! Common test utilities and helpers

#![allow(dead_code)]

use chrono::NaiveDate;

/// Test data utilities
pub mod test_data {
    use super::*;
    use dividend_tracker::models::{Config, DateRange, TickerCatalog, TickerEntry};
    use std::collections::HashMap;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    /// Configuration pointing both providers at mock servers, without pacing
    pub fn config(yahoo_base_url: &str, sheets_base_url: &str) -> Config {
        let vars: HashMap<&str, String> = [
            ("GOOGLE_CREDENTIALS_PATH", "unused.json".to_string()),
            ("SPREADSHEET_ID", "sheet-1".to_string()),
            ("YAHOO_BASE_URL", yahoo_base_url.to_string()),
            ("SHEETS_BASE_URL", sheets_base_url.to_string()),
            ("RATE_LIMIT_PER_MINUTE", "0".to_string()),
        ]
        .into_iter()
        .collect();

        Config::from_vars(|key| vars.get(key).cloned(), date(2025, 1, 1)).unwrap()
    }

    /// Catalog from `(symbol, display_symbol)` pairs
    pub fn catalog(entries: &[(&str, &str)]) -> TickerCatalog {
        TickerCatalog::new(
            entries
                .iter()
                .map(|(symbol, display)| TickerEntry::new(*symbol, *display))
                .collect(),
        )
        .unwrap()
    }

    /// Unix timestamp of 14:30 UTC on `date`, the usual US market-open stamp
    pub fn market_open_utc(date: NaiveDate) -> i64 {
        date.and_hms_opt(14, 30, 0).unwrap().and_utc().timestamp()
    }

    /// Yahoo chart body carrying the given `(date, amount)` dividends
    pub fn yahoo_chart_with_dividends(symbol: &str, dividends: &[(NaiveDate, f64)]) -> serde_json::Value {
        let events: serde_json::Map<String, serde_json::Value> = dividends
            .iter()
            .map(|(date, amount)| {
                let ts = market_open_utc(*date);
                (ts.to_string(), serde_json::json!({ "amount": amount, "date": ts }))
            })
            .collect();

        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": symbol, "gmtoffset": -14400 },
                    "timestamp": [],
                    "events": { "dividends": events }
                }],
                "error": null
            }
        })
    }

    pub fn yahoo_chart_without_dividends(symbol: &str) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{ "meta": { "symbol": symbol, "gmtoffset": -14400 } }],
                "error": null
            }
        })
    }

    pub fn yahoo_not_found() -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        })
    }

    /// Sheets API `spreadsheets.get` body with the given tab titles
    pub fn spreadsheet_body(spreadsheet_id: &str, titles: &[&str]) -> serde_json::Value {
        let sheets: Vec<serde_json::Value> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                serde_json::json!({ "properties": { "sheetId": i * 100, "title": title, "index": i } })
            })
            .collect();

        serde_json::json!({
            "spreadsheetId": spreadsheet_id,
            "properties": { "title": "Portfolio" },
            "sheets": sheets
        })
    }
}

/// Credentials for exercising the Google auth flow against a mock server
pub mod credentials {
    use dividend_tracker::api::TokenSource;
    use dividend_tracker::error::AuthError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_private_key.pem");
    pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_public_key.pem");
    pub const TEST_CLIENT_EMAIL: &str = "tracker@dividend-tests.iam.gserviceaccount.com";

    pub fn service_account_json(token_uri: &str) -> String {
        serde_json::json!({
            "type": "service_account",
            "project_id": "dividend-tests",
            "private_key_id": "test-key-1",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": TEST_CLIENT_EMAIL,
            "token_uri": token_uri
        })
        .to_string()
    }

    /// Key file on disk pointing at `token_uri`; deleted when dropped
    pub fn service_account_file(token_uri: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(service_account_json(token_uri).as_bytes()).unwrap();
        file
    }

    /// Token source that always hands out the same bearer token
    pub struct StaticToken(pub &'static str);

    #[async_trait::async_trait]
    impl TokenSource for StaticToken {
        async fn access_token(&self) -> Result<String, AuthError> {
            Ok(self.0.to_string())
        }
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::info;

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // Only initialize if not already initialized
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("dividend_tracker=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("Test Step: {}", step);
    }
}
