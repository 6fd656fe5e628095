use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{SpreadsheetService, TokenSource};
use crate::error::SheetsError;
use crate::models::{Config, Spreadsheet, ValueInputOption, Worksheet};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: String,
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<Value>>,
}

/// Google Sheets API v4 client
pub struct SheetsClient<'a> {
    client: Client,
    base_url: Url,
    session: &'a dyn TokenSource,
}

impl<'a> SheetsClient<'a> {
    pub fn new(config: &Config, session: &'a dyn TokenSource) -> Result<Self> {
        Self::with_base_url(&config.sheets_base_url, session)
    }

    pub fn with_base_url(base_url: &str, session: &'a dyn TokenSource) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dividend-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            session,
        })
    }

    /// `{base}/v4/spreadsheets/{id}/{rest...}`
    fn spreadsheet_url(&self, spreadsheet_id: &str, rest: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id])
            .extend(rest);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.session.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api { status, body });
        }

        Ok(response)
    }
}

/// A1 reference to a whole tab. Quotes inside the title are doubled.
pub fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[async_trait::async_trait]
impl<'a> SpreadsheetService for SheetsClient<'a> {
    async fn open_by_key(&self, spreadsheet_id: &str) -> Result<Spreadsheet, SheetsError> {
        let mut url = self.spreadsheet_url(spreadsheet_id, &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "spreadsheetId,properties.title,sheets.properties");

        debug!("Opening spreadsheet {}", spreadsheet_id);

        let response = self.send(self.client.get(url)).await?;
        let body: SpreadsheetResponse = response.json().await?;

        let worksheets = body
            .sheets
            .into_iter()
            .map(|sheet| Worksheet {
                spreadsheet_id: body.spreadsheet_id.clone(),
                sheet_id: sheet.properties.sheet_id,
                title: sheet.properties.title,
            })
            .collect();

        Ok(Spreadsheet {
            spreadsheet_id: body.spreadsheet_id,
            title: body.properties.title,
            worksheets,
        })
    }

    async fn clear(&self, worksheet: &Worksheet) -> Result<(), SheetsError> {
        let segment = format!("{}:clear", sheet_range(&worksheet.title));
        let url = self.spreadsheet_url(&worksheet.spreadsheet_id, &["values", &segment])?;

        debug!("Clearing worksheet '{}'", worksheet.title);

        self.send(self.client.post(url).json(&serde_json::json!({})))
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        worksheet: &Worksheet,
        rows: Vec<Vec<Value>>,
        input_option: ValueInputOption,
    ) -> Result<(), SheetsError> {
        let range = format!("{}!A1", sheet_range(&worksheet.title));
        let mut url = self.spreadsheet_url(&worksheet.spreadsheet_id, &["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input_option.as_str());

        let row_count = rows.len();
        let body = ValueRange {
            range: &range,
            major_dimension: "ROWS",
            values: rows,
        };

        self.send(self.client.put(url).json(&body)).await?;
        debug!("Wrote {} rows to worksheet '{}'", row_count, worksheet.title);
        Ok(())
    }
}
