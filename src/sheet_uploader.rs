use tracing::{error, info};

use crate::api::SpreadsheetService;
use crate::error::SheetsError;
use crate::models::{header_row, DividendRecord, SheetTarget, ValueInputOption};

/// How an upload attempt ended
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded { rows: usize },
    SheetNotFound,
    Failed(SheetsError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// Replaces the contents of one worksheet with the dividend table
pub struct SheetUploader<'a, S: SpreadsheetService + ?Sized> {
    service: &'a S,
}

impl<'a, S: SpreadsheetService + ?Sized> SheetUploader<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Open the spreadsheet, clear the target sheet and write the header plus
    /// one row per record. Nothing is cleared when the sheet does not exist.
    pub async fn upload(&self, records: &[DividendRecord], target: &SheetTarget) -> UploadOutcome {
        match self.try_upload(records, target).await {
            Ok(rows) => {
                info!("Dividend data uploaded successfully to Google Sheets ({} records)", rows);
                UploadOutcome::Uploaded { rows }
            }
            Err(SheetsError::WorksheetNotFound { sheet_name, .. }) => {
                error!("Worksheet '{}' not found in the spreadsheet.", sheet_name);
                UploadOutcome::SheetNotFound
            }
            Err(e) => {
                error!("Error uploading data to Google Sheets: {}", e);
                UploadOutcome::Failed(e)
            }
        }
    }

    async fn try_upload(&self, records: &[DividendRecord], target: &SheetTarget) -> Result<usize, SheetsError> {
        info!("Connecting to Google Sheet...");
        let spreadsheet = self.service.open_by_key(&target.spreadsheet_id).await?;
        let worksheet = spreadsheet.worksheet(&target.sheet_name)?;

        info!("Clearing existing data in the sheet...");
        self.service.clear(&worksheet).await?;

        info!("Uploading {} records to Google Sheets...", records.len());
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(header_row());
        rows.extend(records.iter().map(DividendRecord::to_row));

        self.service
            .update(&worksheet, rows, ValueInputOption::UserEntered)
            .await?;

        Ok(records.len())
    }
}
