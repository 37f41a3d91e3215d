//! Error types.
//!
//! Internally the crate works with `anyhow` via the `Res<T>` alias. At the edges (commands and the
//! HTTP server) errors are classified with an `ErrorType` so that callers can tell a rejected
//! request apart from a failing Google API call.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an error by who is at fault and how it should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The request was missing a field or carried a value that cannot be used.
    Request,
    /// The month block that should receive an entry has no empty row left.
    Full,
    /// Missing, invalid or expired credentials.
    Unauthorized,
    /// The named project or tab does not exist.
    NotFound,
    /// The thing being created already exists.
    Conflict,
    /// The configuration or home directory is missing or broken.
    Config,
    /// A call to Google Sheets or Google Drive failed.
    Service,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// An error with an `ErrorType` attached.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Shorthand for an error built from a message.
    pub fn msg(error_type: ErrorType, message: impl Display) -> Self {
        Self::new(error_type, anyhow::anyhow!("{message}"))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The outermost message, without the context chain.
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.inner)
        } else {
            Display::fmt(&self.inner, f)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorType::Internal, value)
    }
}

/// Converts an internal `Res<T>` into a public `Result<T>` with a classification.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_keeps_type_and_message() {
        let res: Res<()> = Err(anyhow::anyhow!("inner")).context("outer");
        let err = res.pub_result(ErrorType::Service).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Service);
        assert_eq!(err.message(), "outer");
        assert_eq!(format!("{err:#}"), "outer: inner");
    }

    #[test]
    fn test_from_anyhow_is_internal() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::NotFound.to_string(), "not_found");
    }
}
