//! Per-host logging clients
//!
//! A [`ClientFactory`] turns a `hostname:port` endpoint and a set of
//! [`ClientParams`] into a [`LoggingClient`] speaking the backend protocol.
//! Callers always `close()` a client once they are done with it, whether the
//! work succeeded or not.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use unified_logging_entities::{ExpirationRequest, LogResponseList, SearchRequest, Success};

use crate::error::CoordError;

mod http;
#[cfg(test)]
pub mod mock;

pub use http::{HttpClientFactory, HttpLoggingClient};

/// Transport security options for backend connections
#[derive(Debug, Clone)]
pub struct ClientParams {
    pub use_tls: bool,
    pub skip_server_cert_validation: bool,
    /// CA certificate (PEM) trusted instead of the system roots
    pub ca_cert_path: Option<PathBuf>,
    /// Client certificate and private key (single PEM bundle) for mutual TLS
    pub client_cert_path: Option<PathBuf>,
    /// Upper bound for a single call against one host
    pub timeout: Duration,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            use_tls: false,
            skip_server_cert_validation: false,
            ca_cert_path: None,
            client_cert_path: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors from a single backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("certificate error for {}: {message}", path.display())]
    Certificate { path: PathBuf, message: String },

    #[error("client setup failed: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("client for {0} is closed")]
    Closed(String),
}

impl From<ClientError> for CoordError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidAddress { .. } => CoordError::invalid_argument(err.to_string()),
            ClientError::Transport(_) | ClientError::Timeout(_) => CoordError::unavailable("backend unreachable", err),
            _ => CoordError::internal("backend call failed", err),
        }
    }
}

/// Handle to one logging backend
#[async_trait]
pub trait LoggingClient: Send + Sync {
    /// Endpoint this client talks to
    fn host(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<LogResponseList, ClientError>;

    async fn expire(&self, request: &ExpirationRequest) -> Result<Success, ClientError>;

    /// Release the connection; later calls fail with [`ClientError::Closed`]
    async fn close(&self) -> Result<(), ClientError>;
}

/// Creates clients for backend endpoints
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, host: &str, params: &ClientParams) -> Result<Box<dyn LoggingClient>, ClientError>;
}

/// Split `hostname:port` into its parts
pub fn split_host(host: &str) -> Result<(&str, u16), ClientError> {
    let invalid = |reason: &str| ClientError::InvalidAddress {
        address: host.to_string(),
        reason: reason.to_string(),
    };

    let (hostname, port) = host.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if hostname.is_empty() {
        return Err(invalid("missing hostname"));
    }
    let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
    if port == 0 {
        return Err(invalid("port must be positive"));
    }
    Ok((hostname, port))
}
