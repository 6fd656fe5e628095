use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use super::{ApiRateLimiter, DividendProvider};
use crate::error::FetchError;
use crate::models::{Config, DateRange, DividendEvent};

/// Yahoo Finance chart response, reduced to the dividend events
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, RawDividend>,
}

#[derive(Debug, Deserialize)]
struct RawDividend {
    amount: f64,
    date: i64,
}

/// Dividend history client for the Yahoo Finance chart API
pub struct YahooClient {
    client: Client,
    base_url: Url,
    rate_limiter: ApiRateLimiter,
}

impl YahooClient {
    /// Create a new Yahoo client
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; dividend-tracker/1.0)")
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.yahoo_base_url)?,
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    fn chart_url(&self, symbol: &str, range: DateRange) -> Result<Url, FetchError> {
        // One day of slack on both sides; exact filtering happens on exchange-local dates.
        let period1 = timestamp_at_midnight(range.start - Duration::days(1));
        let period2 = timestamp_at_midnight(range.end + Duration::days(2));

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Provider {
                symbol: symbol.to_string(),
                message: format!("base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div");

        Ok(url)
    }
}

#[async_trait::async_trait]
impl DividendProvider for YahooClient {
    async fn get_dividends(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<DividendEvent>, FetchError> {
        let url = self.chart_url(symbol, range)?;

        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(symbol, status, &body));
        }

        let events = parse_dividends(symbol, &body, range)?;
        debug!(
            "Retrieved {} dividend events for {} from {} to {}",
            events.len(),
            symbol,
            range.start,
            range.end
        );
        Ok(events)
    }
}

fn timestamp_at_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// `not_found` forces the unknown-symbol kind, e.g. when the HTTP status was 404
fn chart_error_to_fetch_error(symbol: &str, error: ChartError, not_found: bool) -> FetchError {
    let unknown = not_found || error.code.eq_ignore_ascii_case("Not Found");
    let message = if error.description.is_empty() {
        error.code
    } else {
        error.description
    };

    if unknown {
        FetchError::UnknownSymbol {
            symbol: symbol.to_string(),
            message,
        }
    } else {
        FetchError::Provider {
            symbol: symbol.to_string(),
            message,
        }
    }
}

fn classify_failure(symbol: &str, status: StatusCode, body: &str) -> FetchError {
    let chart_error = serde_json::from_str::<ChartResponse>(body)
        .ok()
        .and_then(|r| r.chart.error);

    match chart_error {
        Some(error) => chart_error_to_fetch_error(symbol, error, status == StatusCode::NOT_FOUND),
        None if status == StatusCode::NOT_FOUND => FetchError::UnknownSymbol {
            symbol: symbol.to_string(),
            message: "symbol not found".to_string(),
        },
        None => FetchError::Provider {
            symbol: symbol.to_string(),
            message: format!("status {}: {}", status, body.chars().take(200).collect::<String>()),
        },
    }
}

/// Extract the dividend events of a chart response whose exchange-local date
/// lies inside `range`, sorted by date.
fn parse_dividends(
    symbol: &str,
    body: &str,
    range: DateRange,
) -> Result<Vec<DividendEvent>, FetchError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })?;

    if let Some(error) = response.chart.error {
        return Err(chart_error_to_fetch_error(symbol, error, false));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::MalformedResponse {
            symbol: symbol.to_string(),
            message: "no chart data in response".to_string(),
        })?;

    let dividends = match result.events {
        Some(events) => events.dividends,
        None => return Ok(Vec::new()),
    };

    let mut events = Vec::with_capacity(dividends.len());
    for raw in dividends.into_values() {
        // gmtoffset is the exchange's current offset, not the one in force on
        // the payout date. A DST shift of an hour cannot carry a session
        // timestamp across midnight, so the local date is unaffected.
        let date = DateTime::from_timestamp(raw.date + result.meta.gmtoffset, 0)
            .ok_or_else(|| FetchError::MalformedResponse {
                symbol: symbol.to_string(),
                message: format!("invalid dividend timestamp {}", raw.date),
            })?
            .date_naive();

        if range.contains(date) {
            events.push(DividendEvent {
                date,
                amount: raw.amount,
            });
        }
    }

    events.sort_by_key(|e| e.date);
    Ok(events)
}
