//! Access tokens for the Google APIs, obtained from a stored OAuth refresh token.
//!
//! Getting the refresh token in the first place (the consent flow) is done outside this app. The
//! `TokenProvider` only exchanges the refresh token for short-lived access tokens and writes the
//! latest one back to `token.json`.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::error::Res;
use anyhow::Context;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use std::path::Path;
use tracing::{debug, info};

/// Google access tokens last an hour. Used when a token response does not say.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Loads the client secret and the token file. Does not contact Google.
    pub(crate) async fn load(
        client_secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Res<Self> {
        let secret = SecretFile::load(client_secret_path.as_ref()).await?;
        let token: File<TokenFile> = File::load(token_path.as_ref())
            .await
            .context("Unable to deserialize the token JSON file")?;
        token.data().validate()?;
        let http = reqwest::Client::builder()
            // Following redirects opens the client to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the OAuth HTTP client")?;
        Ok(Self {
            secret,
            token,
            http,
        })
    }

    /// Returns a valid access token, refreshing it first if it is missing or about to expire.
    pub(crate) async fn token(&mut self) -> Res<String> {
        if self.token.data().is_expired(Utc::now()) {
            self.refresh().await?;
        }
        Ok(self.token.data().access_token().to_string())
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        debug!("Refreshing the Google access token");
        let client = BasicClient::new(ClientId::new(self.secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(self.secret.client_secret().to_string()))
            .set_token_uri(
                TokenUrl::new(self.secret.token_uri().to_string())
                    .context("Invalid token_uri in the client secret file")?,
            );

        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Unable to refresh the OAuth access token")?;

        let expires_in = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            Utc::now() + expires_in,
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await?;
        info!(
            "Saved a refreshed access token to {}",
            self.token.path().display()
        );
        Ok(())
    }
}
