use crate::auth::Claims;
use crate::error::ErrorType;
use crate::server::AppState;
use crate::Error;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use std::sync::Arc;

/// The verified claims of the `Authorization: Bearer <token>` header. Handlers that take this
/// extractor reject requests without a valid token with 401.
pub struct Bearer(pub Claims);

impl FromRequestParts<Arc<AppState>> for Bearer {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::msg(
                    ErrorType::Unauthorized,
                    "No bearer token was sent. Log in first",
                )
            })?;
        state.auth.verify(token, Utc::now()).map(Bearer)
    }
}
