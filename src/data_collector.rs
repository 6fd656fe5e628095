use tracing::{error, info, warn};

use crate::api::DividendProvider;
use crate::error::FetchError;
use crate::models::{DateRange, DividendRecord, TickerCatalog, TickerEntry};

/// What happened to a single ticker during collection
#[derive(Debug)]
pub enum TickerOutcome {
    /// Dividends found; holds the number of records added
    Fetched(usize),
    /// Query succeeded but returned no dividends in range
    Empty,
    /// Query failed; the ticker was skipped
    Failed(FetchError),
}

/// Result of one pass over the catalog
#[derive(Debug, Default)]
pub struct CollectionReport {
    /// Records in fetch order
    pub records: Vec<DividendRecord>,
    /// Tickers whose query succeeded, with or without dividends
    pub tickers_processed: usize,
    pub outcomes: Vec<(String, TickerOutcome)>,
}

impl CollectionReport {
    pub fn failed_symbols(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, TickerOutcome::Failed(_)))
            .map(|(symbol, _)| symbol.as_str())
            .collect()
    }
}

/// Walks the ticker catalog and gathers dividend records from a provider
pub struct DividendCollector<'a, P: DividendProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: DividendProvider + ?Sized> DividendCollector<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Query every ticker once, in catalog order. Failures are logged and
    /// skipped; they never stop the pass.
    pub async fn collect(&self, catalog: &TickerCatalog, range: DateRange) -> CollectionReport {
        let mut report = CollectionReport::default();

        for entry in catalog.iter() {
            info!("Fetching dividends for {} ({})...", entry.symbol, entry.display_symbol);

            let outcome = self.collect_ticker(entry, range, &mut report.records).await;
            match &outcome {
                TickerOutcome::Fetched(count) => {
                    info!("Found {} dividend records for {}.", count, entry.symbol);
                    report.tickers_processed += 1;
                }
                TickerOutcome::Empty => {
                    warn!("No dividend data found for {}.", entry.symbol);
                    report.tickers_processed += 1;
                }
                TickerOutcome::Failed(e) => {
                    error!("Error fetching data for {}: {}", entry.symbol, e);
                }
            }

            report.outcomes.push((entry.symbol.clone(), outcome));
        }

        info!(
            "Collected dividend data for {} of {} tickers ({} records, {} failed)",
            report.tickers_processed,
            catalog.len(),
            report.records.len(),
            report.outcomes.len() - report.tickers_processed
        );

        report
    }

    async fn collect_ticker(
        &self,
        entry: &TickerEntry,
        range: DateRange,
        records: &mut Vec<DividendRecord>,
    ) -> TickerOutcome {
        let events = match self.provider.get_dividends(&entry.symbol, range).await {
            Ok(events) => events,
            Err(e) => return TickerOutcome::Failed(e),
        };

        let before = records.len();
        records.extend(
            events
                .iter()
                .filter(|event| range.contains(event.date))
                .map(|event| DividendRecord::from_event(entry, event)),
        );

        match records.len() - before {
            0 => TickerOutcome::Empty,
            added => TickerOutcome::Fetched(added),
        }
    }
}
