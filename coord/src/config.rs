//! Coordinator configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use unified_logging_entities::LIMIT_PER_SEARCH;

use crate::client::ClientParams;

const LOCAL_CONFIG_FILE: &str = ".unified-logging-coord.yml";
const APP_DIR: &str = "unified-logging-coord";
const USER_CONFIG_FILE: &str = "config.yml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the coordinator listens on
    pub port: u16,

    /// Cluster registry, `host:port` or URL
    #[serde(rename = "registry-address")]
    pub registry_address: String,

    /// Prepended, followed by `.`, to every cluster hostname
    #[serde(rename = "app-cluster-prefix")]
    pub app_cluster_prefix: String,

    /// Port of the logging backend on every cluster
    #[serde(rename = "app-cluster-port")]
    pub app_cluster_port: u16,

    #[serde(rename = "use-tls")]
    pub use_tls: bool,

    #[serde(rename = "skip-server-cert-validation")]
    pub skip_server_cert_validation: bool,

    #[serde(rename = "ca-cert-path", skip_serializing_if = "Option::is_none")]
    pub ca_cert_path: Option<PathBuf>,

    /// PEM bundle with client certificate and private key
    #[serde(rename = "client-cert-path", skip_serializing_if = "Option::is_none")]
    pub client_cert_path: Option<PathBuf>,

    /// Maximum number of entries in a merged search response
    #[serde(rename = "limit-per-search")]
    pub limit_per_search: usize,

    /// Per-host request timeout in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Clusters contacted at the same time during a fan-out
    #[serde(rename = "max-concurrent-hosts")]
    pub max_concurrent_hosts: usize,

    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8323,
            registry_address: "localhost:8800".to_string(),
            app_cluster_prefix: String::new(),
            app_cluster_port: 443,
            use_tls: true,
            skip_server_cert_validation: false,
            ca_cert_path: None,
            client_cert_path: None,
            limit_per_search: LIMIT_PER_SEARCH,
            request_timeout_ms: 30_000,
            max_concurrent_hosts: 16,
            log_level: None,
        }
    }
}

impl Config {
    /// Check the configuration before the service starts
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(eyre::eyre!("port must be specified"));
        }
        if self.registry_address.trim().is_empty() {
            return Err(eyre::eyre!("registry-address must be specified"));
        }
        if self.app_cluster_port == 0 {
            return Err(eyre::eyre!("app-cluster-port must be specified"));
        }
        if self.limit_per_search == 0 {
            return Err(eyre::eyre!("limit-per-search must be greater than 0"));
        }
        if self.max_concurrent_hosts == 0 {
            return Err(eyre::eyre!("max-concurrent-hosts must be greater than 0"));
        }
        if self.request_timeout_ms == 0 {
            return Err(eyre::eyre!("request-timeout-ms must be greater than 0"));
        }
        for (name, path) in [
            ("ca-cert-path", &self.ca_cert_path),
            ("client-cert-path", &self.client_cert_path),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(eyre::eyre!("{name} cannot be empty"));
            }
        }
        Ok(())
    }

    /// Log the effective configuration
    pub fn print(&self) {
        info!(version = env!("CARGO_PKG_VERSION"), "Unified logging coordinator");
        info!(port = self.port, "Listening port");
        info!(registry = %self.registry_address, "Cluster registry");
        info!(
            prefix = %self.app_cluster_prefix,
            port = self.app_cluster_port,
            "Application cluster"
        );
        info!(
            use_tls = self.use_tls,
            skip_server_cert_validation = self.skip_server_cert_validation,
            ca_cert = ?self.ca_cert_path,
            client_cert = ?self.client_cert_path,
            "Backend TLS"
        );
        info!(
            limit_per_search = self.limit_per_search,
            request_timeout_ms = self.request_timeout_ms,
            max_concurrent_hosts = self.max_concurrent_hosts,
            "Fan-out"
        );
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn client_params(&self) -> ClientParams {
        ClientParams {
            use_tls: self.use_tls,
            skip_server_cert_validation: self.skip_server_cert_validation,
            ca_cert_path: self.ca_cert_path.clone(),
            client_cert_path: self.client_cert_path.clone(),
            timeout: self.request_timeout(),
        }
    }

    /// Load from `config_path`, else from the first readable default location
    ///
    /// An explicit path must load. Default locations that fail to parse are
    /// skipped with a warning, and with none left the defaults apply.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).with_context(|| format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Skipping unreadable config file"),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Default locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR).join(USER_CONFIG_FILE));
        }
        paths
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let config = serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))?;
        debug!(path = %path.display(), "Config::load_from_file: loaded");
        Ok(config)
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}
