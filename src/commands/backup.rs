use crate::api::{self, CopiedFile, Mode, Sheet};
use crate::backup::Backup;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use std::sync::Arc;

/// Copies the spreadsheet into the configured Drive folder, the same way
/// `POST /backup/spreadsheet` does.
pub async fn backup(config: Config, mode: Mode, prefix: Option<&str>) -> Result<Out<CopiedFile>> {
    let sheet = api::sheet(&config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    backup_with(&config, sheet, prefix).await
}

async fn backup_with(
    config: &Config,
    sheet: Arc<dyn Sheet>,
    prefix: Option<&str>,
) -> Result<Out<CopiedFile>> {
    let file = Backup::new(sheet, config.sheet_name(), config.backup_folder_id())
        .run(prefix)
        .await?;
    let message = match &file.web_view_link {
        Some(link) => format!("Copied the spreadsheet to '{}' ({link})", file.name),
        None => format!("Copied the spreadsheet to '{}'", file.name),
    };
    Ok(Out::new(message, file))
}
