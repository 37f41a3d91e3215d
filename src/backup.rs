//! Backups of the whole spreadsheet, made as Drive copies.

use crate::api::{CopiedFile, Sheet};
use crate::error::{ErrorType, IntoResult, Result};
use crate::Error;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Prefix used when the caller gives none.
pub const DEFAULT_PREFIX: &str = "backup";

/// Copies the spreadsheet into the configured Drive folder.
///
/// The `Backup` struct is immutable and owns copies of the settings it needs. Create it via
/// `Backup::new()` with values taken from `Config`.
pub struct Backup {
    sheet: Arc<dyn Sheet>,
    sheet_name: String,
    folder_id: Option<String>,
}

impl Backup {
    pub fn new(sheet: Arc<dyn Sheet>, sheet_name: &str, folder_id: Option<&str>) -> Self {
        Self {
            sheet,
            sheet_name: sheet_name.to_string(),
            folder_id: folder_id
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        }
    }

    /// Copies the spreadsheet as `<prefix>-<sheet_name>-<timestamp>`.
    ///
    /// Fails with `ErrorType::Request` when no backup folder is configured.
    pub async fn run(&self, prefix: Option<&str>) -> Result<CopiedFile> {
        let folder_id = self.folder_id.as_deref().ok_or_else(|| {
            Error::msg(
                ErrorType::Request,
                "No backup folder is configured. Create a folder in Google Drive, share it with \
                 the account used by this app and set backup_folder_id in config.json",
            )
        })?;
        let name = backup_name(prefix, &self.sheet_name, Utc::now());
        info!("Copying the spreadsheet to '{name}'");
        let file = self
            .sheet
            .copy_spreadsheet(&name, folder_id)
            .await
            .pub_result(ErrorType::Service)?;
        info!("Backup created with id {}", file.id);
        Ok(file)
    }
}

/// `<prefix>-<sheet_name>-<timestamp>` where the timestamp is ISO 8601 in UTC with `:` and `.`
/// replaced by `-`.
fn backup_name(prefix: Option<&str>, sheet_name: &str, now: DateTime<Utc>) -> String {
    let prefix = prefix
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PREFIX);
    let ts = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{prefix}-{sheet_name}-{ts}")
}
