//! Serialization structures for the Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the refresh token, plus the most recent access token

use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Access tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// A JSON file held in memory along with the path it was loaded from, so that it can be saved back.
#[derive(Default, Debug, Clone)]
pub(crate) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(crate) async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    /// Saves the data, readable only by the current user.
    pub(crate) async fn save(&self) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write_secret(&self.path, json).await
    }

    pub(crate) fn data(&self) -> &F {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// The `client_secret.json` file downloaded from Google Cloud Console. Google wraps the
/// credentials in `installed` for desktop clients and in `web` for web clients.
///
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct SecretFile {
    #[serde(alias = "web")]
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(crate) async fn load(path: &Path) -> Res<SecretFile> {
        utils::deserialize(path)
            .await
            .context("Unable to read the OAuth client secret file")
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(crate) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The saved OAuth token. Only `refresh_token` is required; a file without an access token is
/// refreshed on first use.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct TokenFile {
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    /// A file that lists scopes must list all the scopes the app needs.
    pub(crate) fn validate(&self) -> Res<()> {
        if self.refresh_token.trim().is_empty() {
            bail!("The token file has an empty refresh_token");
        }
        if self.scopes.is_empty() {
            return Ok(());
        }
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(crate) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self.expires_at <= now + chrono::Duration::seconds(EXPIRY_BUFFER_SECS)
    }

    pub(crate) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_client_secret_installed() {
        let json = r#"
{
    "installed": {
        "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
        "client_secret": "YOUR_CLIENT_SECRET",
        "redirect_uris": ["http://localhost"],
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }
}
"#;
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("client_secret.json");
        utils::write(&p, json).await.unwrap();
        let secret = SecretFile::load(&p).await.unwrap();
        assert_eq!(secret.client_id(), "YOUR_CLIENT_ID.apps.googleusercontent.com");
        assert_eq!(secret.client_secret(), "YOUR_CLIENT_SECRET");
    }

    #[tokio::test]
    async fn test_client_secret_web_default_token_uri() {
        let json = r#"{"web": {"client_id": "id", "client_secret": "s"}}"#;
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("client_secret.json");
        utils::write(&p, json).await.unwrap();
        let secret = SecretFile::load(&p).await.unwrap();
        assert_eq!(secret.token_uri(), DEFAULT_TOKEN_URI);
    }

    #[tokio::test]
    async fn test_token_file_missing_scope() {
        let json = r#"
        {
            "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
            "access_token": "abc12",
            "refresh_token": "xyz89",
            "expires_at": "2025-01-01T00:00:00Z"
        }
        "#;
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("token.json");
        utils::write(&p, json).await.unwrap();
        let token: File<TokenFile> = File::load(&p).await.unwrap();
        let message = token.data().validate().err().unwrap().to_string();
        assert!(message.contains("https://www.googleapis.com/auth/drive"));
    }

    #[tokio::test]
    async fn test_token_file_refresh_token_only() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("token.json");
        utils::write(&p, r#"{"refresh_token": "xyz89"}"#).await.unwrap();
        let token: File<TokenFile> = File::load(&p).await.unwrap();
        token.data().validate().unwrap();
        let token = token.data();
        assert_eq!(token.refresh_token(), "xyz89");
        assert!(token.is_expired(Utc::now()));
    }

    #[test]
    fn test_is_expired_uses_buffer() {
        let now = Utc::now();
        let mut token = TokenFile {
            refresh_token: "r".into(),
            ..Default::default()
        };
        token.update("a".into(), now + chrono::Duration::seconds(30), None);
        assert!(token.is_expired(now));
        token.update("a".into(), now + chrono::Duration::minutes(10), None);
        assert!(!token.is_expired(now));
        assert_eq!(token.access_token(), "a");
    }
}
