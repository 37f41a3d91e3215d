//! The remote collaborators: a spreadsheet and the Drive file that holds it.
//!
//! Everything that touches Google goes through the `Sheet` trait. `GoogleSheet` implements it
//! with the Sheets v4 and Drive v3 REST APIs, `TestSheet` implements it in memory.

mod files;
mod google;
mod oauth;
mod test_sheet;

use crate::error::Res;
use crate::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) use google::GoogleSheet;
pub(crate) use oauth::TokenProvider;
pub use test_sheet::TestSheet;

/// OAuth scopes needed to read and write the spreadsheet and to copy it in Drive.
pub(crate) const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// When this environment variable is set and non-empty the app runs against a seeded `TestSheet`.
pub const TEST_MODE_ENV: &str = "KONSTRUKTOR_IN_TEST_MODE";

/// Rows of cells, as the Sheets API exchanges them.
pub type Grid = Vec<Vec<Value>>;

/// How cell values are rendered when read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Render {
    /// Raw values. Dates come back as serial numbers.
    #[default]
    #[serde(rename = "UNFORMATTED_VALUE")]
    Value,
    /// Formula text where a cell holds a formula.
    #[serde(rename = "FORMULA")]
    Formula,
    /// Values as displayed, all strings.
    #[serde(rename = "FORMATTED_VALUE")]
    Formatted,
}

serde_plain::derive_display_from_serialize!(Render);

/// How written values are interpreted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Input {
    /// Parsed as if typed into the UI: numbers, dates and formulas are recognized.
    #[default]
    #[serde(rename = "USER_ENTERED")]
    UserEntered,
    /// Stored as given.
    #[serde(rename = "RAW")]
    Raw,
}

serde_plain::derive_display_from_serialize!(Input);

/// A tab of the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// The first tab of a spreadsheet usually has id 0, which the API may omit.
    #[serde(rename = "sheetId", default)]
    pub id: i64,
    pub title: String,
}

/// The Drive file created by a copy.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// The spreadsheet operations the app needs. Ranges are A1 strings with the tab name quoted.
///
/// Implementations take `&self` so one instance can be shared by all requests.
#[async_trait::async_trait]
pub trait Sheet: Send + Sync {
    /// Reads one range. Trailing empty rows and cells are omitted.
    async fn get(&self, range: &str, render: Render) -> Res<Grid>;

    /// Reads several ranges in one call. The result has one grid per range, in order.
    async fn batch_get(&self, ranges: &[String], render: Render) -> Res<Vec<Grid>>;

    /// Overwrites the cells of `range`, starting at its top left corner.
    async fn update(&self, range: &str, values: Grid, input: Input) -> Res<()>;

    /// Inserts `values` below the last occupied row of `range`. Returns the raw API reply.
    async fn append(&self, range: &str, values: Grid, input: Input) -> Res<Value>;

    async fn clear(&self, range: &str) -> Res<()>;

    async fn tabs(&self) -> Res<Vec<Tab>>;

    async fn add_tab(&self, title: &str) -> Res<Tab>;

    async fn delete_tab(&self, id: i64) -> Res<()>;

    /// Copies the whole spreadsheet file into a Drive folder under a new name.
    async fn copy_spreadsheet(&self, name: &str, folder_id: &str) -> Res<CopiedFile>;
}

/// Whether to talk to Google or to an in-memory sheet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Testing,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Testing` when `KONSTRUKTOR_IN_TEST_MODE` is set to something non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Sheet` for `mode`.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Res<Arc<dyn Sheet>> {
    match mode {
        Mode::Google => {
            debug!("Using the Google Sheets API");
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Arc::new(GoogleSheet::new(
                config.spreadsheet_id(),
                token_provider,
            )))
        }
        Mode::Testing => {
            warn!("{TEST_MODE_ENV} is set, using an in-memory sheet");
            Ok(Arc::new(TestSheet::default()))
        }
    }
}

#[test]
fn test_render_names() {
    assert_eq!(Render::Value.to_string(), "UNFORMATTED_VALUE");
    assert_eq!(Render::Formula.to_string(), "FORMULA");
    assert_eq!(Input::UserEntered.to_string(), "USER_ENTERED");
    assert_eq!(Input::Raw.to_string(), "RAW");
}

#[test]
fn test_copied_file_deserialize() {
    let json = r#"{"id":"abc","name":"backup-Sheet1","webViewLink":"https://x","createdTime":"2025-01-01T00:00:00Z"}"#;
    let file: CopiedFile = serde_json::from_str(json).unwrap();
    assert_eq!(file.id, "abc");
    assert_eq!(file.web_view_link.as_deref(), Some("https://x"));
}
