//! Host resolution
//!
//! Turns a request scope into the list of backend endpoints a fan-out must
//! reach. Scope fields other than the organization are accepted but do not
//! narrow the result yet; every serving cluster of the organization is
//! returned.

use std::sync::Arc;

use tracing::debug;
use unified_logging_entities::FilterFields;

use crate::error::CoordError;
use crate::registry::ClusterRegistry;

/// One backend to contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    /// `hostname:port`
    pub host: String,
    /// Registry cluster id, reported back on failure
    pub id: String,
}

pub struct HostResolver {
    registry: Arc<dyn ClusterRegistry>,
    prefix: String,
    port: u16,
}

impl HostResolver {
    pub fn new(registry: Arc<dyn ClusterRegistry>, prefix: &str, port: u16) -> Self {
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}.")
        };
        Self { registry, prefix, port }
    }

    pub async fn get_hosts(&self, fields: &FilterFields) -> Result<Vec<ClusterEndpoint>, CoordError> {
        debug!(organization_id = %fields.organization_id, "HostResolver::get_hosts: called");

        let clusters = self
            .registry
            .list_clusters(&fields.organization_id)
            .await
            .map_err(|e| CoordError::internal("error getting cluster list", e))?;

        let endpoints: Vec<_> = clusters
            .into_iter()
            .filter(|cluster| {
                let keep = !cluster.status.is_offline();
                if !keep {
                    debug!(cluster_id = %cluster.cluster_id, status = ?cluster.status, "HostResolver::get_hosts: skipping offline cluster");
                }
                keep
            })
            .map(|cluster| ClusterEndpoint {
                host: format!("{}{}:{}", self.prefix, cluster.hostname, self.port),
                id: cluster.cluster_id,
            })
            .collect();

        debug!(count = endpoints.len(), "HostResolver::get_hosts: resolved endpoints");
        Ok(endpoints)
    }
}
