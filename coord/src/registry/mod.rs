//! Cluster registry
//!
//! The registry knows every application cluster an organization owns and
//! whether it is currently serving.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpClusterRegistry;

/// Serving state reported by the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Online,
    OnlineCordon,
    Offline,
    OfflineCordon,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ClusterStatus {
    pub fn is_offline(&self) -> bool {
        matches!(self, ClusterStatus::Offline | ClusterStatus::OfflineCordon)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub cluster_id: String,
    pub hostname: String,
    pub status: ClusterStatus,
}

impl Cluster {
    pub fn new(cluster_id: impl Into<String>, hostname: impl Into<String>, status: ClusterStatus) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            hostname: hostname.into(),
            status,
        }
    }
}

/// Body of a cluster listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterList {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("registry returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// All clusters of an organization, regardless of status
    async fn list_clusters(&self, organization_id: &str) -> Result<Vec<Cluster>, RegistryError>;
}
