//! HTTP/JSON logging client

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::{Certificate, Identity};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use unified_logging_entities::{ExpirationRequest, LogResponseList, SearchRequest, Success};

use super::{ClientError, ClientFactory, ClientParams, LoggingClient, split_host};

const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Builds [`HttpLoggingClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn connect(&self, host: &str, params: &ClientParams) -> Result<Box<dyn LoggingClient>, ClientError> {
        Ok(Box::new(HttpLoggingClient::connect(host, params)?))
    }
}

/// Client for one backend's `/v1/search` and `/v1/expire` endpoints
#[derive(Debug)]
pub struct HttpLoggingClient {
    host: String,
    base_url: String,
    http: reqwest::Client,
    built_in_roots: bool,
    closed: AtomicBool,
}

impl HttpLoggingClient {
    pub fn connect(host: &str, params: &ClientParams) -> Result<Self, ClientError> {
        let (hostname, port) = split_host(host)?;
        debug!(
            %host,
            tls = params.use_tls,
            ca_cert = ?params.ca_cert_path,
            client_cert = ?params.client_cert_path,
            skip_server_cert_validation = params.skip_server_cert_validation,
            "HttpLoggingClient::connect: creating connection"
        );

        let mut builder = reqwest::Client::builder().timeout(params.timeout);
        let mut built_in_roots = true;

        let scheme = if params.use_tls {
            builder = builder.use_rustls_tls().https_only(true);

            if let Some(path) = &params.ca_cert_path {
                debug!(ca_cert = %path.display(), "HttpLoggingClient::connect: loading CA certificate");
                let pem = read_pem(path)?;
                if !String::from_utf8_lossy(&pem).contains(PEM_CERTIFICATE_MARKER) {
                    return Err(certificate_error(path, "no PEM certificate found"));
                }
                let ca = Certificate::from_pem(&pem).map_err(|e| certificate_error(path, e))?;
                builder = builder.tls_built_in_root_certs(false).add_root_certificate(ca);
                built_in_roots = false;
            }

            if params.skip_server_cert_validation {
                warn!(%host, "Skipping server certificate validation");
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(path) = &params.client_cert_path {
                debug!(client_cert = %path.display(), "HttpLoggingClient::connect: loading client certificate");
                let pem = read_pem(path)?;
                let identity = Identity::from_pem(&pem).map_err(|e| certificate_error(path, e))?;
                builder = builder.identity(identity);
            }

            "https"
        } else {
            "http"
        };

        let http = builder.build().map_err(ClientError::Setup)?;

        Ok(Self {
            host: host.to_string(),
            base_url: format!("{scheme}://{hostname}:{port}"),
            http,
            built_in_roots,
            closed: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// False once a configured CA replaces the system roots
    pub fn trusts_built_in_roots(&self) -> bool {
        self.built_in_roots
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed(self.host.clone()));
        }
        Ok(())
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.ensure_open()?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "HttpLoggingClient::post: sending request");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<serde_json::Value>(&bytes)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl LoggingClient for HttpLoggingClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn search(&self, request: &SearchRequest) -> Result<LogResponseList, ClientError> {
        self.post("/v1/search", request).await
    }

    async fn expire(&self, request: &ExpirationRequest) -> Result<Success, ClientError> {
        self.post("/v1/expire", request).await
    }

    async fn close(&self) -> Result<(), ClientError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ClientError::Closed(self.host.clone()));
        }
        debug!(host = %self.host, "HttpLoggingClient::close: closed");
        Ok(())
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ClientError> {
    std::fs::read(path).map_err(|e| certificate_error(path, e))
}

fn certificate_error(path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Certificate {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
