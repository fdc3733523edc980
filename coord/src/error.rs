//! Coordinator error types

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad classification surfaced to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors returned by a Search or Expire call
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl CoordError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CoordError::InvalidArgument(message.into())
    }

    pub fn unavailable(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CoordError::Unavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CoordError::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal_msg(message: impl Into<String>) -> Self {
        CoordError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoordError::Unavailable { .. } => ErrorKind::Unavailable,
            CoordError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Message including the chain of underlying causes
    pub fn report(&self) -> String {
        let mut report = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            report.push_str(": ");
            report.push_str(&cause.to_string());
            source = cause.source();
        }
        report
    }
}

impl ResponseError for CoordError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind().as_str(),
        }))
    }
}
