use crate::commands::Out;
use crate::{Config, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What `init` created. `password` is only present when `admin.json` was written by this run.
#[derive(Debug, Clone, Serialize)]
pub struct InitOut {
    pub home: PathBuf,
    pub admin_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Creates the home directory, its `.secrets` subdirectory and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Moves `secret_file` into its default location in the home directory
/// - Generates `admin.json` unless one already exists
///
/// # Arguments
/// - `konstruktor_home` - The directory that will be the home directory, e.g.
///   `$HOME/konstruktor`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON.
/// - `sheet_url` - The URL of the Google Sheet, e.g.
///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
///
/// # Errors
/// - Returns an error if the URL has no spreadsheet ID or any file operation fails.
pub async fn init(
    konstruktor_home: &Path,
    secret_file: &Path,
    sheet_url: &str,
) -> Result<Out<InitOut>> {
    let config = Config::create(konstruktor_home, secret_file, sheet_url).await?;
    let (admin, created) = config.init_admin().await?;

    let mut message = format!(
        "Successfully created the konstruktor directory and config at {}",
        config.root().display()
    );
    let password = if created {
        message.push_str(&format!(
            "\n\nAdmin login: {} / {}\nThis password is shown only once. It is stored in {}",
            admin.email,
            admin.password,
            config.admin_path().display()
        ));
        Some(admin.password.clone())
    } else {
        None
    };
    message.push_str(&format!(
        "\n\nPut the OAuth token JSON with your refresh token at {}",
        config.token_path().display()
    ));

    Ok(Out::new(
        message,
        InitOut {
            home: config.root().to_path_buf(),
            admin_email: admin.email,
            password,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_home_and_admin() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("client.json");
        std::fs::write(&secret, "{}").unwrap();
        let home = dir.path().join("home");

        let out = init(
            &home,
            &secret,
            "https://docs.google.com/spreadsheets/d/abc123/edit",
        )
        .await
        .unwrap();
        let structure = out.structure().unwrap();
        assert_eq!(structure.admin_email, "admin@konstruktor.com");
        let password = structure.password.clone().unwrap();
        assert!(out.message().contains(&password));
        assert!(home.join("config.json").is_file());
        assert!(home.join(".secrets").join("client_secret.json").is_file());
        assert!(home.join(".secrets").join("admin.json").is_file());
        assert!(!secret.exists());

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.spreadsheet_id(), "abc123");
        assert_eq!(config.load_admin().await.unwrap().password, password);
    }

    #[tokio::test]
    async fn test_init_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("client.json");
        std::fs::write(&secret, "{}").unwrap();
        let err = init(&dir.path().join("home"), &secret, "not a sheet url")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Config);
    }
}
