//! CLI command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::Config;

/// Unified logging coordinator
#[derive(Debug, Parser)]
#[command(
    name = "unified-logging-coord",
    about = "Fans log searches out to every application cluster of an organization",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the coordinator service
    Run(RunArgs),

    /// Print the effective configuration as YAML
    Config(RunArgs),
}

/// Overrides for values from the config file
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Cluster registry address
    #[arg(long)]
    pub registry_address: Option<String>,

    /// Prefix for application cluster hostnames
    #[arg(long)]
    pub app_cluster_prefix: Option<String>,

    /// Port of the logging backend on application clusters
    #[arg(long)]
    pub app_cluster_port: Option<u16>,

    /// Use TLS towards application clusters
    #[arg(long, value_name = "BOOL")]
    pub use_tls: Option<bool>,

    /// Do not verify application cluster certificates
    #[arg(long)]
    pub skip_server_cert_validation: bool,

    /// CA certificate to trust for application clusters
    #[arg(long)]
    pub ca_cert_path: Option<PathBuf>,

    /// Client certificate and key (PEM) for mutual TLS
    #[arg(long)]
    pub client_cert_path: Option<PathBuf>,

    /// Maximum number of entries returned by a search
    #[arg(long)]
    pub limit_per_search: Option<usize>,
}

impl RunArgs {
    /// Flags win over config file values
    pub fn apply(&self, config: &mut Config) {
        debug!(args = ?self, "RunArgs::apply: called");
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = &self.registry_address {
            config.registry_address = address.clone();
        }
        if let Some(prefix) = &self.app_cluster_prefix {
            config.app_cluster_prefix = prefix.clone();
        }
        if let Some(port) = self.app_cluster_port {
            config.app_cluster_port = port;
        }
        if let Some(use_tls) = self.use_tls {
            config.use_tls = use_tls;
        }
        if self.skip_server_cert_validation {
            config.skip_server_cert_validation = true;
        }
        if let Some(path) = &self.ca_cert_path {
            config.ca_cert_path = Some(path.clone());
        }
        if let Some(path) = &self.client_cert_path {
            config.client_cert_path = Some(path.clone());
        }
        if let Some(limit) = self.limit_per_search {
            config.limit_per_search = limit;
        }
    }
}
