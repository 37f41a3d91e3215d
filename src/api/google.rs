//! Implements the `Sheet` trait with the `sheets` client for Sheets v4 and plain reqwest for the
//! Drive v3 copy.

use crate::api::{CopiedFile, Grid, Input, Render, Sheet, Tab, TokenProvider};
use crate::error::Res;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::{json, Value};
use sheets::types::{
    BatchClearValuesRequest, BatchUpdateSpreadsheetRequest, BatchUpdateValuesRequest,
    DateTimeRenderOption, Dimension, InsertDataOption, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tokio::sync::Mutex;
use tracing::{error, trace};
use url::Url;

const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const COPY_FIELDS: &str = "id,name,webViewLink,createdTime";

/// Talks to one spreadsheet. The `TokenProvider` sits behind a mutex so that concurrent requests
/// share a single refresh.
pub(crate) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: Mutex<TokenProvider>,
    http: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: Tab,
}

impl GoogleSheet {
    pub(crate) fn new(spreadsheet_id: impl Into<String>, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider: Mutex::new(token_provider),
            http: reqwest::Client::new(),
        }
    }

    async fn access_token(&self) -> Res<String> {
        self.token_provider.lock().await.token().await
    }

    /// A Sheets client carrying a fresh access token. The client id, secret and redirect uri are
    /// only used by the client's own OAuth flow, which is not used here.
    async fn client(&self) -> Res<sheets::Client> {
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            self.access_token().await?,
            String::new(),
        ))
    }

    /// Sends one spreadsheets.batchUpdate request and returns its first reply as JSON.
    async fn batch_update(&self, request: Value, what: &str) -> Res<Value> {
        let body: BatchUpdateSpreadsheetRequest =
            serde_json::from_value(json!({ "requests": [request] }))
                .with_context(|| format!("Unable to build the {what} request"))?;
        let response = self
            .client()
            .await?
            .spreadsheets()
            .batch_update(&self.spreadsheet_id, &body)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("The {what} request failed"))?;
        let reply = serde_json::to_value(&response.body)
            .with_context(|| format!("Unable to read the {what} reply"))?;
        Ok(reply
            .get("replies")
            .and_then(|r| r.get(0))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&self, range: &str, render: Render) -> Res<Grid> {
        trace!("get {range} ({render})");
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                range,
                date_time_option(render),
                Dimension::Rows,
                value_render_option(render),
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to read {range}"))?;
        Ok(grid_from_cells(response.body.values, render))
    }

    async fn batch_get(&self, ranges: &[String], render: Render) -> Res<Vec<Grid>> {
        trace!("batch_get {ranges:?} ({render})");
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_batch_get(
                &self.spreadsheet_id,
                date_time_option(render),
                Dimension::Rows,
                ranges,
                value_render_option(render),
            )
            .await
            .map_err(map_client_error)
            .context("Failed to read the ranges")?;
        let mut grids: Vec<Grid> = response
            .body
            .value_ranges
            .into_iter()
            .map(|vr| grid_from_cells(vr.values, render))
            .collect();
        grids.resize(ranges.len(), Grid::new());
        Ok(grids)
    }

    async fn update(&self, range: &str, values: Grid, input: Input) -> Res<()> {
        trace!("update {range} ({input})");
        let request = BatchUpdateValuesRequest {
            data: vec![value_range(range, values)],
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(value_input_option(input)),
        };
        self.client()
            .await?
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to write {range}"))?;
        Ok(())
    }

    async fn append(&self, range: &str, values: Grid, input: Input) -> Res<Value> {
        trace!("append {range} ({input})");
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_append(
                &self.spreadsheet_id,
                range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::FormattedString,
                ValueRenderOption::FormattedValue,
                value_input_option(input),
                &value_range(range, values),
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to append to {range}"))?;
        serde_json::to_value(&response.body).context("Unable to read the append reply")
    }

    async fn clear(&self, range: &str) -> Res<()> {
        trace!("clear {range}");
        let request = BatchClearValuesRequest {
            ranges: vec![range.to_string()],
        };
        self.client()
            .await?
            .spreadsheets()
            .values_batch_clear(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to clear {range}"))?;
        Ok(())
    }

    async fn tabs(&self) -> Res<Vec<Tab>> {
        let response = self
            .client()
            .await?
            .spreadsheets()
            .get(&self.spreadsheet_id, false, &[])
            .await
            .map_err(map_client_error)
            .context("Failed to read the spreadsheet tabs")?;
        let json = serde_json::to_value(&response.body).context("Unable to read the tabs")?;
        tabs_from_json(json)
    }

    async fn add_tab(&self, title: &str) -> Res<Tab> {
        trace!("add_tab {title}");
        let request = json!({ "addSheet": { "properties": { "title": title } } });
        let reply = self.batch_update(request, "addSheet").await?;
        let properties = reply
            .get("addSheet")
            .and_then(|r| r.get("properties"))
            .cloned()
            .context("The addSheet reply has no sheet properties")?;
        serde_json::from_value(properties).context("Unable to parse the addSheet reply")
    }

    async fn delete_tab(&self, id: i64) -> Res<()> {
        trace!("delete_tab {id}");
        let request = json!({ "deleteSheet": { "sheetId": id } });
        let _ = self.batch_update(request, "deleteSheet").await?;
        Ok(())
    }

    async fn copy_spreadsheet(&self, name: &str, folder_id: &str) -> Res<CopiedFile> {
        trace!("copy_spreadsheet {name} into {folder_id}");
        let mut url = Url::parse(DRIVE_FILES_API).context("Bad Drive API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Drive API URL cannot have path segments"))?
            .push(&self.spreadsheet_id)
            .push("copy");
        url.query_pairs_mut()
            .append_pair("supportsAllDrives", "true")
            .append_pair("fields", COPY_FIELDS);
        let body = json!({ "name": name, "parents": [folder_id] });

        let response = self
            .http
            .post(url)
            .bearer_auth(self.access_token().await?)
            .json(&body)
            .send()
            .await
            .context("Failed to send the files.copy request")?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            error!("Google Drive API copy failed with status {status}: {body}");
            bail!("Google Drive API copy failed with status {status}: {body}");
        }
        response
            .json()
            .await
            .context("Failed to parse the files.copy response")
    }
}

fn value_render_option(render: Render) -> ValueRenderOption {
    match render {
        Render::Value => ValueRenderOption::UnformattedValue,
        Render::Formula => ValueRenderOption::Formula,
        Render::Formatted => ValueRenderOption::FormattedValue,
    }
}

fn date_time_option(render: Render) -> DateTimeRenderOption {
    match render {
        Render::Value => DateTimeRenderOption::SerialNumber,
        Render::Formula | Render::Formatted => DateTimeRenderOption::FormattedString,
    }
}

fn value_input_option(input: Input) -> ValueInputOption {
    match input {
        Input::UserEntered => ValueInputOption::UserEntered,
        Input::Raw => ValueInputOption::Raw,
    }
}

fn value_range(range: &str, values: Grid) -> ValueRange {
    ValueRange {
        major_dimension: Some(Dimension::Rows),
        range: range.to_string(),
        values: cells_from_grid(values),
    }
}

/// The client exchanges cells as text. Unformatted reads turn numeric text back into numbers so
/// that date serials and amounts keep their type.
fn grid_from_cells(rows: Vec<Vec<String>>, render: Render) -> Grid {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match render {
                    Render::Value => number_cell(&cell).unwrap_or(Value::String(cell)),
                    Render::Formula | Render::Formatted => Value::String(cell),
                })
                .collect()
        })
        .collect()
}

fn number_cell(cell: &str) -> Option<Value> {
    if let Ok(n) = cell.parse::<i64>() {
        return Some(Value::from(n));
    }
    let f = cell.parse::<f64>().ok().filter(|f| f.is_finite())?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

fn cells_from_grid(values: Grid) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::Null => String::new(),
                    Value::String(s) => s,
                    Value::Bool(true) => "TRUE".to_string(),
                    Value::Bool(false) => "FALSE".to_string(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn tabs_from_json(json: Value) -> Res<Vec<Tab>> {
    let meta: SpreadsheetMeta =
        serde_json::from_value(json).context("Unable to parse the spreadsheet metadata")?;
    Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    error!("Google Sheets API error: {error_name}");
    anyhow::Error::new(e).context(error_name)
}
