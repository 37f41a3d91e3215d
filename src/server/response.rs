//! JSON envelopes: `{"success": true, ...}` for results and `{"success": false, "message": ...}`
//! for errors.

use crate::error::ErrorType;
use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

impl ErrorType {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorType::Request | ErrorType::Full => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::Config | ErrorType::Service | ErrorType::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.error_type().status();
        if status.is_server_error() {
            error!("{} error: {self:#}", self.error_type());
        } else {
            warn!("{status}: {}", self.message());
        }
        let body = Failure {
            success: false,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Turns a body that failed to parse into a request error.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> crate::Result<T> {
    body.map(|Json(t)| t)
        .map_err(|e| Error::msg(ErrorType::Request, e.body_text()))
}

/// A successful reply. The fields of `T` are flattened next to `success` and the optional
/// `message`.
pub(crate) struct Success<T> {
    message: Option<String>,
    body: T,
}

impl<T> Success<T> {
    pub(crate) fn new(body: T) -> Self {
        Self {
            message: None,
            body,
        }
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// For replies that only carry a message.
#[derive(Serialize)]
pub(crate) struct NoBody {}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(flatten)]
    body: &'a T,
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            success: true,
            message: self.message.as_deref(),
            body: &self.body,
        })
        .into_response()
    }
}
