//! Registry client over HTTP/JSON

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::{Cluster, ClusterList, ClusterRegistry, RegistryError};

#[derive(Debug, Clone)]
pub struct HttpClusterRegistry {
    base: Url,
    http: Client,
}

impl HttpClusterRegistry {
    /// `address` is `host:port` or a full `http(s)://` URL
    pub fn new(address: &str, timeout: Duration) -> Result<Self, RegistryError> {
        debug!(%address, ?timeout, "HttpClusterRegistry::new: called");
        let invalid = |reason: String| RegistryError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        let address = address.trim();
        if address.is_empty() {
            return Err(invalid("address is empty".to_string()));
        }
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let base = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(invalid("not a base URL".to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    /// URL of the cluster listing for one organization
    pub fn clusters_url(&self, organization_id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "organizations", organization_id, "clusters"]);
        }
        url
    }
}

#[async_trait]
impl ClusterRegistry for HttpClusterRegistry {
    async fn list_clusters(&self, organization_id: &str) -> Result<Vec<Cluster>, RegistryError> {
        let url = self.clusters_url(organization_id);
        debug!(%url, "HttpClusterRegistry::list_clusters: called");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let list: ClusterList = response.json().await?;
        debug!(count = list.clusters.len(), "HttpClusterRegistry::list_clusters: received clusters");
        Ok(list.clusters)
    }
}
