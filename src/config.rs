//! Configuration file handling for Konstruktor.
//!
//! The configuration file is stored at `$KONSTRUKTOR_HOME/config.json` and contains the Google
//! Sheet URL, server settings and the paths of the credential files kept under `.secrets`.

use crate::auth::AdminCredentials;
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_NAME: &str = "konstruktor";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const ADMIN_JSON: &str = "admin.json";
const CONFIG_JSON: &str = "config.json";

const DEFAULT_SHEET_NAME: &str = "Sheet1";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_RESERVE_ROWS: usize = 30;
const DEFAULT_DASHBOARD_TTL_SECS: u64 = 60;
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:5174"];

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$KONSTRUKTOR_HOME` and from there it loads `$KONSTRUKTOR_HOME/config.json`. It
/// provides paths to other items that are either configurable or are expected in a certain
/// location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
}

impl Config {
    /// Creates the home directory and its `.secrets` subdirectory, moves `secret_file` into
    /// `.secrets/client_secret.json` and writes an initial `config.json` for `sheet_url`.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Result<Self> {
        Self::try_create(dir.into(), secret_file, sheet_url)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn try_create(maybe_relative: PathBuf, secret_file: &Path, sheet_url: &str) -> Res<Self> {
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract the spreadsheet ID from the sheet URL")?
            .to_string();

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the konstruktor home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        utils::rename(secret_file, secrets.join(CLIENT_SECRET_JSON)).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;
        info!("Wrote {}", config_path.display());

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// Validates that the home directory, `config.json` and `.secrets` exist and loads the config.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::try_load(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn try_load(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The konstruktor home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract the spreadsheet ID from the sheet URL")?
            .to_string();

        let secrets = root.join(SECRETS);
        if !secrets.is_dir() {
            bail!("The secrets directory is missing '{}'", secrets.display())
        }
        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// Loads `admin.json`, creating it with a generated password and secret when it does not
    /// exist yet. The second value is true when the file was created.
    pub async fn init_admin(&self) -> Result<(AdminCredentials, bool)> {
        let path = self.admin_path();
        if path.is_file() {
            return Ok((self.load_admin().await?, false));
        }
        let admin = AdminCredentials::generate();
        let data = serde_json::to_string_pretty(&admin).context("Unable to serialize admin.json")?;
        utils::write_secret(&path, data)
            .await
            .pub_result(ErrorType::Config)?;
        info!("Wrote {}", path.display());
        Ok((admin, true))
    }

    /// Loads and validates `admin.json`.
    pub async fn load_admin(&self) -> Result<AdminCredentials> {
        let path = self.admin_path();
        let load = async {
            let admin: AdminCredentials = utils::deserialize(&path).await?;
            admin
                .validate()
                .with_context(|| format!("Invalid admin file '{}'", path.display()))?;
            Res::Ok(admin)
        };
        load.await.pub_result(ErrorType::Config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// The tab behind the raw "rekap" endpoints. Also part of backup names.
    pub fn sheet_name(&self) -> &str {
        &self.config_file.sheet_name
    }

    pub fn backup_folder_id(&self) -> Option<&str> {
        self.config_file.backup_folder_id.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.config_file.port
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.config_file.allowed_origins
    }

    pub fn reserve_rows(&self) -> usize {
        self.config_file.reserve_rows
    }

    pub fn dashboard_ttl_secs(&self) -> u64 {
        self.config_file.dashboard_ttl_secs
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    /// Returns the stored `admin_path` if it is absolute, otherwise resolves the relative path.
    pub fn admin_path(&self) -> PathBuf {
        self.resolve(self.config_file.admin_path())
    }

    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "konstruktor",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "sheet_name": "Sheet1",
///   "backup_folder_id": "1AbCdEfGhIjKlMnOpQrStUvWxYz",
///   "port": 4000,
///   "allowed_origins": ["http://localhost:5173"],
///   "reserve_rows": 30,
///   "dashboard_ttl_secs": 60
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "konstruktor"
    app_name: String,

    config_version: u8,

    /// URL of the Google Sheet
    sheet_url: String,

    #[serde(default = "default_sheet_name")]
    sheet_name: String,

    /// Drive folder receiving spreadsheet copies. Backups are refused without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backup_folder_id: Option<String>,

    #[serde(default = "default_port")]
    port: u16,

    #[serde(default = "default_origins")]
    allowed_origins: Vec<String>,

    /// Rows reserved for each new month block
    #[serde(default = "default_reserve_rows")]
    reserve_rows: usize,

    #[serde(default = "default_dashboard_ttl_secs")]
    dashboard_ttl_secs: u64,

    /// Relative to the home directory, or absolute.
    /// Defaults to $KONSTRUKTOR_HOME/.secrets/client_secret.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Defaults to $KONSTRUKTOR_HOME/.secrets/token.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,

    /// Defaults to $KONSTRUKTOR_HOME/.secrets/admin.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_path: Option<PathBuf>,
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_origins() -> Vec<String> {
    DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect()
}

fn default_reserve_rows() -> usize {
    DEFAULT_RESERVE_ROWS
}

fn default_dashboard_ttl_secs() -> u64 {
    DEFAULT_DASHBOARD_TTL_SECS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            sheet_name: default_sheet_name(),
            backup_folder_id: None,
            port: DEFAULT_PORT,
            allowed_origins: default_origins(),
            reserve_rows: DEFAULT_RESERVE_ROWS,
            dashboard_ttl_secs: DEFAULT_DASHBOARD_TTL_SECS,
            client_secret_path: None,
            token_path: None,
            admin_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(config.reserve_rows > 0, "reserve_rows must be at least 1");
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }

    fn admin_path(&self) -> PathBuf {
        self.admin_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(ADMIN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL such as
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit`.
fn extract_spreadsheet_id(url: &str) -> Res<&str> {
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            if id.is_empty() {
                break;
            }
            return Ok(id);
        }
    }
    bail!(
        "Invalid Google Sheets URL '{url}'. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str =
        "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("konstruktor_home");
        let secret_source_file = dir.path().join("x.json");
        utils::write(&secret_source_file, "12345").await.unwrap();

        let config = Config::create(&home_dir, &secret_source_file, URL)
            .await
            .unwrap();
        assert_eq!(URL, config.sheet_url());
        assert_eq!(
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
            config.spreadsheet_id()
        );
        assert_eq!(
            "12345",
            utils::read(&config.client_secret_path()).await.unwrap()
        );
        assert!(!secret_source_file.exists());
        assert!(config.secrets().is_dir());

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.port(), 4000);
        assert_eq!(loaded.sheet_name(), "Sheet1");
        assert_eq!(loaded.reserve_rows(), 30);
        assert_eq!(loaded.dashboard_ttl_secs(), 60);
        assert_eq!(loaded.backup_folder_id(), None);
        assert_eq!(loaded.allowed_origins().len(), 2);
        assert_eq!(loaded.token_path(), loaded.root().join(".secrets/token.json"));
    }

    #[tokio::test]
    async fn test_config_create_bad_url_leaves_secret() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("x.json");
        utils::write(&secret, "{}").await.unwrap();
        let err = Config::create(dir.path().join("home"), &secret, "https://example.com/x")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(secret.exists());
    }

    #[tokio::test]
    async fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "konstruktor",
            "config_version": 1,
            "sheet_url": "https://docs.google.com/spreadsheets/d/minimal",
            "backup_folder_id": "folder",
            "port": 8080
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.backup_folder_id.as_deref(), Some("folder"));
        assert_eq!(config.reserve_rows, 30);
        assert_eq!(
            config.admin_path(),
            PathBuf::from(SECRETS).join(ADMIN_JSON)
        );
    }

    #[tokio::test]
    async fn test_config_file_load_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{"app_name": "someapp", "config_version": 1, "sheet_url": ""}"#;
        utils::write(&config_path, json).await.unwrap();
        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));

        let json = r#"{"app_name": "konstruktor", "config_version": 1, "sheet_url": "", "reserve_rows": 0}"#;
        utils::write(&config_path, json).await.unwrap();
        assert!(ConfigFile::load(&config_path).await.is_err());
    }

    #[test]
    fn test_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("client_secret_path"));
        assert!(!json.contains("backup_folder_id"));
        assert!(json.contains("allowed_origins"));
    }

    #[tokio::test]
    async fn test_admin_file() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("x.json");
        utils::write(&secret, "{}").await.unwrap();
        let config = Config::create(dir.path().join("home"), &secret, URL)
            .await
            .unwrap();

        let (admin, created) = config.init_admin().await.unwrap();
        assert!(created);
        let (again, created) = config.init_admin().await.unwrap();
        assert!(!created);
        assert_eq!(admin, again);
        assert_eq!(config.load_admin().await.unwrap().email, "admin@konstruktor.com");

        utils::write(config.admin_path(), r#"{"email":"a","password":"b","jwt_secret":"short"}"#)
            .await
            .unwrap();
        let err = config.load_admin().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[test]
    fn test_extract_spreadsheet_id() {
        assert_eq!(
            extract_spreadsheet_id(URL).unwrap(),
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL"
        );
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123?foo=bar").unwrap(),
            "ABC123"
        );
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123#gid=0").unwrap(),
            "ABC123"
        );
        assert!(extract_spreadsheet_id("https://example.com/invalid").is_err());
        assert!(extract_spreadsheet_id("").is_err());
    }
}
