//! Admin login and bearer tokens.
//!
//! There is a single admin whose credentials live in `admin.json`. A successful login returns an
//! HS256 JSON Web Token signed with the secret from the same file. Tokens expire after
//! `token_ttl_hours` and cannot be revoked before that.

use crate::error::{ErrorType, Res, Result};
use crate::Error;
use anyhow::{anyhow, bail, Context};
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@konstruktor.com";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;
pub const ADMIN_ROLE: &str = "admin";
/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// The contents of `admin.json`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
    pub jwt_secret: String,
    #[serde(default = "default_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    DEFAULT_TOKEN_TTL_HOURS
}

impl AdminCredentials {
    /// The default admin with a random password and signing secret.
    pub fn generate() -> Self {
        Self {
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password: uuid::Uuid::new_v4().simple().to_string()[..16].to_string(),
            jwt_secret: format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            ),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }

    pub(crate) fn validate(&self) -> Res<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            bail!("The admin email and password must not be empty");
        }
        if self.jwt_secret.len() < 16 {
            bail!("The jwt_secret must be at least 16 characters long");
        }
        if self.token_ttl_hours <= 0 || self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!("token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}");
        }
        Ok(())
    }
}

impl Debug for AdminCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"********")
            .field("jwt_secret", &"********")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

/// What a token says about its bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub role: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expires at, seconds since the epoch.
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub role: String,
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// The login body. Both fields are checked for presence before they are compared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Login {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct Auth {
    admin: AdminCredentials,
}

impl Auth {
    pub fn new(admin: AdminCredentials) -> Self {
        Self { admin }
    }

    pub fn login(&self, login: &Login) -> Result<Session> {
        let email = login.email.as_deref().map(str::trim).unwrap_or_default();
        let password = login.password.as_deref().unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(Error::msg(
                ErrorType::Request,
                "email and password are required",
            ));
        }
        // Both fields are always compared so the reply time does not reveal which one was wrong.
        let email_ok = self.same_secret(email, &self.admin.email)?;
        let password_ok = self.same_secret(password, &self.admin.password)?;
        if !(email_ok && password_ok) {
            warn!("Failed login for '{email}'");
            return Err(Error::msg(
                ErrorType::Unauthorized,
                "The email or password is wrong",
            ));
        }
        let token = self.issue(email, Utc::now())?;
        debug!("Issued a token for '{email}'");
        Ok(Session {
            token,
            user: User {
                email: email.to_string(),
                role: ADMIN_ROLE.to_string(),
            },
        })
    }

    /// Signs a token for `email` valid from `now` for the configured number of hours.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            email: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: (now + TimeDelta::hours(self.admin.token_ttl_hours)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let payload = serde_json::to_vec(&claims).context("Unable to serialize the claims")?;
        let signing_input = format!("{}.{}", B64.encode(HEADER), B64.encode(payload));
        let signature = self.mac()?.chain_update(signing_input.as_bytes()).finalize();
        Ok(format!(
            "{signing_input}.{}",
            B64.encode(signature.into_bytes())
        ))
    }

    /// Checks the signature and expiry of `token`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        self.decode(token, now).map_err(|e| {
            debug!("Rejected token: {e:#}");
            Error::msg(ErrorType::Unauthorized, "The token is invalid or expired")
        })
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Res<Claims> {
        let mut parts = token.trim().split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            bail!("The token does not have three parts");
        };
        let signature = B64.decode(signature).context("Bad signature encoding")?;
        self.mac()?
            .chain_update(format!("{header}.{payload}").as_bytes())
            .verify_slice(&signature)
            .map_err(|_| anyhow!("Bad signature"))?;
        let header: serde_json::Value =
            serde_json::from_slice(&B64.decode(header).context("Bad header encoding")?)
                .context("Bad header")?;
        if header["alg"] != "HS256" {
            bail!("Unexpected algorithm {}", header["alg"]);
        }
        let claims: Claims =
            serde_json::from_slice(&B64.decode(payload).context("Bad payload encoding")?)
                .context("Bad claims")?;
        if claims.exp <= now.timestamp() {
            bail!("The token expired at {}", claims.exp);
        }
        Ok(claims)
    }

    /// Compares `given` with `expected` in constant time by checking HMACs of both.
    fn same_secret(&self, given: &str, expected: &str) -> Res<bool> {
        let expected = self
            .mac()?
            .chain_update(expected.as_bytes())
            .finalize()
            .into_bytes();
        Ok(self
            .mac()?
            .chain_update(given.as_bytes())
            .verify_slice(&expected)
            .is_ok())
    }

    fn mac(&self) -> Res<HmacSha256> {
        HmacSha256::new_from_slice(self.admin.jwt_secret.as_bytes())
            .map_err(|_| anyhow!("Unable to create the token signer"))
    }
}
