pub mod api;
pub mod data_collector;
pub mod error;
pub mod models;
pub mod sheet_uploader;

use tracing::{info, warn};

use crate::api::{DividendProvider, SpreadsheetService};
use crate::data_collector::{CollectionReport, DividendCollector};
use crate::models::{DateRange, SheetTarget, TickerCatalog};
use crate::sheet_uploader::{SheetUploader, UploadOutcome};

/// Final state of a run. None of these are fatal to the process.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every ticker came back empty or failed; the sheet was left untouched
    NoRecords(CollectionReport),
    Uploaded(CollectionReport, UploadOutcome),
}

impl RunOutcome {
    pub fn report(&self) -> &CollectionReport {
        match self {
            RunOutcome::NoRecords(report) | RunOutcome::Uploaded(report, _) => report,
        }
    }
}

/// Fetch dividends for the whole catalog, then replace the target sheet with
/// them. The uploader is only called when at least one record was collected.
pub async fn run_pipeline<P, S>(
    provider: &P,
    sheets: &S,
    catalog: &TickerCatalog,
    range: DateRange,
    target: &SheetTarget,
) -> RunOutcome
where
    P: DividendProvider + ?Sized,
    S: SpreadsheetService + ?Sized,
{
    info!(
        "Starting dividend data fetch for {} tickers between {} and {}",
        catalog.len(),
        range.start,
        range.end
    );

    let report = DividendCollector::new(provider).collect(catalog, range).await;

    if report.records.is_empty() {
        warn!("No dividend records collected. Skipping upload.");
        return RunOutcome::NoRecords(report);
    }

    let outcome = SheetUploader::new(sheets)
        .upload(&report.records, target)
        .await;

    RunOutcome::Uploaded(report, outcome)
}
