//! Sheets API client against a mock HTTP server

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::credentials::StaticToken;
use crate::common::test_data::spreadsheet_body;
use dividend_tracker::api::{SheetsClient, SpreadsheetService};
use dividend_tracker::error::SheetsError;
use dividend_tracker::models::{ValueInputOption, Worksheet};

const TOKEN: StaticToken = StaticToken("test-token");

fn worksheet(title: &str) -> Worksheet {
    Worksheet {
        spreadsheet_id: "sheet-1".to_string(),
        sheet_id: 100,
        title: title.to_string(),
    }
}

#[tokio::test]
async fn test_open_by_key_lists_worksheets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("fields", "spreadsheetId,properties.title,sheets.properties"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(spreadsheet_body("sheet-1", &["Holdings", "Dividend Amount"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = SheetsClient::with_base_url(&server.uri(), &TOKEN).unwrap();
    let spreadsheet = client.open_by_key("sheet-1").await.unwrap();

    assert_eq!(spreadsheet.title, "Portfolio");
    assert_eq!(spreadsheet.worksheet("Dividend Amount").unwrap(), worksheet("Dividend Amount"));
    assert_matches!(
        spreadsheet.worksheet("Missing"),
        Err(SheetsError::WorksheetNotFound { .. })
    );
}

#[tokio::test]
async fn test_clear_posts_to_whole_sheet_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-1/values/'Dividend(%20| )Amount':clear$"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-1",
            "clearedRange": "'Dividend Amount'!A1:Z1000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SheetsClient::with_base_url(&server.uri(), &TOKEN).unwrap();
    client.clear(&worksheet("Dividend Amount")).await.unwrap();
}

#[tokio::test]
async fn test_update_writes_rows_user_entered() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-1/values/'Payouts'!A1$"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(json!({
            "range": "'Payouts'!A1",
            "majorDimension": "ROWS",
            "values": [["Ticker", "Ex-Dividend Date", "Dividend Amount"], ["NYSE:CCI", "2024-03-14", 1.565]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updatedRows": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SheetsClient::with_base_url(&server.uri(), &TOKEN).unwrap();
    client
        .update(
            &worksheet("Payouts"),
            vec![
                vec![json!("Ticker"), json!("Ex-Dividend Date"), json!("Dividend Amount")],
                vec![json!("NYSE:CCI"), json!("2024-03-14"), json!(1.565)],
            ],
            ValueInputOption::UserEntered,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let client = SheetsClient::with_base_url(&server.uri(), &TOKEN).unwrap();
    let result = client.open_by_key("sheet-1").await;

    assert_matches!(
        result,
        Err(SheetsError::Api { status: 403, body }) if body.contains("PERMISSION_DENIED")
    );
}
