use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dividend_tracker::api::{GoogleSession, SheetsClient, YahooClient};
use dividend_tracker::error::ConfigError;
use dividend_tracker::models::{Config, TickerCatalog};
use dividend_tracker::sheet_uploader::UploadOutcome;
use dividend_tracker::{run_pipeline, RunOutcome};

/// Fetch dividend history for a portfolio and publish it to Google Sheets
#[derive(Parser, Debug)]
#[command(name = "dividend-tracker")]
#[command(version)]
#[command(about = "Fetch dividend history and upload it to a Google Sheet")]
#[command(long_about = "
Fetches ex-dividend dates and amounts for every ticker in the catalog from
Yahoo Finance and replaces the contents of a Google Sheets worksheet with them.

Settings come from the environment (or a .env file); flags override them:
  GOOGLE_CREDENTIALS_PATH, GOOGLE_SCOPES, SPREADSHEET_ID, SHEET_NAME,
  TICKER_CATALOG_PATH, START_DATE, END_DATE, RATE_LIMIT_PER_MINUTE

Examples:
  dividend-tracker
  dividend-tracker --start-date 2024-01-01 --sheet-name 'Dividend Amount'
")]
struct Args {
    /// Service-account key file
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Target spreadsheet ID
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Worksheet (tab) name inside the spreadsheet
    #[arg(long)]
    sheet_name: Option<String>,

    /// CSV ticker catalog with symbol,display_symbol columns
    #[arg(long)]
    tickers: Option<PathBuf>,

    /// First ex-dividend date to include (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Last ex-dividend date to include (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,
}

impl Args {
    /// Flag values keyed by the environment variable they stand in for
    fn into_overrides(self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        let mut set = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key, value);
            }
        };

        set(
            "GOOGLE_CREDENTIALS_PATH",
            self.credentials.map(|p| p.to_string_lossy().into_owned()),
        );
        set("SPREADSHEET_ID", self.spreadsheet_id);
        set("SHEET_NAME", self.sheet_name);
        set(
            "TICKER_CATALOG_PATH",
            self.tickers.map(|p| p.to_string_lossy().into_owned()),
        );
        set("START_DATE", self.start_date);
        set("END_DATE", self.end_date);

        overrides
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dividend_tracker=info")),
        )
        .init();

    let args = Args::parse();

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match TickerCatalog::from_csv_path(&config.ticker_catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load ticker catalog: {}", e);
            std::process::exit(1);
        }
    };
    if catalog.is_empty() {
        warn!("Ticker catalog {} is empty", config.ticker_catalog_path.display());
    } else {
        info!(
            "Loaded {} tickers from {}",
            catalog.len(),
            config.ticker_catalog_path.display()
        );
    }

    let session = match GoogleSession::from_key_file(&config.credentials_path, &config.scopes).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to authenticate with Google Sheets API: {}", e);
            std::process::exit(1);
        }
    };
    info!("Successfully authenticated with Google Sheets API.");

    let yahoo = YahooClient::new(&config)?;
    let sheets = SheetsClient::new(&config, &session)?;

    let outcome = run_pipeline(
        &yahoo,
        &sheets,
        &catalog,
        config.date_range,
        &config.sheet_target(),
    )
    .await;

    match &outcome {
        RunOutcome::NoRecords(_) => info!("Run finished without uploading"),
        RunOutcome::Uploaded(_, UploadOutcome::Uploaded { rows }) => {
            info!("Data successfully updated in Google Sheets ({} rows)", rows)
        }
        RunOutcome::Uploaded(_, _) => info!("Run finished; upload did not complete"),
    }

    let failed = outcome.report().failed_symbols();
    if !failed.is_empty() {
        info!("Tickers skipped after errors: {}", failed.join(", "));
    }

    Ok(())
}

fn load_config(args: Args) -> Result<Config, ConfigError> {
    Config::from_env_with(&args.into_overrides())
}
