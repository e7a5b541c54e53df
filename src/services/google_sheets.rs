use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::info;

use crate::config::{GoogleSettings, ServiceAccountCredentials};
use crate::error::{Error, Result};
use crate::services::google_auth::ServiceAccountAuth;
use crate::services::sheets_backend::{SheetsBackend, SpreadsheetInfo};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Sheets v4 REST client authenticated as a service account.
pub struct GoogleSheetsClient {
    client: Client,
    settings: GoogleSettings,
    auth: ServiceAccountAuth,
}

impl GoogleSheetsClient {
    pub fn new(settings: GoogleSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let auth = ServiceAccountAuth::new(client.clone(), settings.token_uri.clone());
        Ok(Self {
            client,
            settings,
            auth,
        })
    }

    async fn session(&self) -> Result<(ServiceAccountCredentials, String)> {
        let credentials = self.settings.credentials()?;
        let token = self.auth.access_token(&credentials).await?;
        Ok((credentials, token))
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/{}",
            self.settings.sheets_api_base.trim_end_matches('/'),
            spreadsheet_id
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            encode_range(range)
        )
    }

    async fn batch_update(&self, requests: JsonValue) -> Result<JsonValue> {
        let (credentials, token) = self.session().await?;
        let url = format!("{}:batchUpdate", self.spreadsheet_url(&credentials.spreadsheet_id));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

fn encode_range(range: &str) -> String {
    url::form_urlencoded::byte_serialize(range.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn cell_to_string(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(Error::Sheets {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SheetsBackend for GoogleSheetsClient {
    async fn authorize(&self) -> Result<()> {
        let credentials = self.settings.credentials()?;
        self.auth.fresh_token(&credentials).await?;
        Ok(())
    }

    async fn spreadsheet_info(&self) -> Result<SpreadsheetInfo> {
        let (credentials, token) = self.session().await?;
        let response = self
            .client
            .get(self.spreadsheet_url(&credentials.spreadsheet_id))
            .bearer_auth(&token)
            .query(&[("fields", "properties.title,sheets.properties.title")])
            .send()
            .await?;
        let body: JsonValue = check(response).await?.json().await?;

        let title = body["properties"]["title"]
            .as_str()
            .unwrap_or("Unknown spreadsheet")
            .to_string();
        let sheets = body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .map(|s| {
                        s["properties"]["title"]
                            .as_str()
                            .unwrap_or("Unknown sheet")
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(SpreadsheetInfo { title, sheets })
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let (credentials, token) = self.session().await?;
        let response = self
            .client
            .get(self.values_url(&credentials.spreadsheet_id, range))
            .bearer_auth(&token)
            .send()
            .await?;
        let body: ValueRange = check(response).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_value(&self, range: &str, value: &str) -> Result<()> {
        let (credentials, token) = self.session().await?;
        let response = self
            .client
            .put(self.values_url(&credentials.spreadsheet_id, range))
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [[value]] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<()> {
        let (credentials, token) = self.session().await?;
        let url = format!("{}:append", self.values_url(&credentials.spreadsheet_id, range));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn create_sheet(&self, title: &str, header: Vec<String>) -> Result<()> {
        let reply = self
            .batch_update(json!([{ "addSheet": { "properties": { "title": title } } }]))
            .await?;
        let sheet_id = reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| Error::Internal("addSheet reply carried no sheetId".to_string()))?;
        info!(sheet = title, sheet_id, "created sheet");

        let last_column = crate::utils::a1::column_letter(header.len().max(1));
        self.update_row(&format!("{}!A1:{}1", title, last_column), header)
            .await?;

        self.batch_update(json!([{
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": {
                    "userEnteredFormat": {
                        "textFormat": { "bold": true },
                        "backgroundColor": { "red": 0.9, "green": 0.9, "blue": 0.9 }
                    }
                },
                "fields": "userEnteredFormat(textFormat,backgroundColor)"
            }
        }]))
        .await?;
        Ok(())
    }
}

impl GoogleSheetsClient {
    async fn update_row(&self, range: &str, row: Vec<String>) -> Result<()> {
        let (credentials, token) = self.session().await?;
        let response = self
            .client
            .put(self.values_url(&credentials.spreadsheet_id, range))
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
