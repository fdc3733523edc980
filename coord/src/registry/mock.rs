//! Mock cluster registry for testing

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Cluster, ClusterRegistry, RegistryError};

/// Registry returning a fixed cluster list, or failing every call
pub struct MockRegistry {
    clusters: Vec<Cluster>,
    fail: bool,
    pub call_count: AtomicUsize,
}

impl MockRegistry {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self {
            clusters,
            fail: false,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            clusters: Vec::new(),
            fail: true,
            call_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ClusterRegistry for MockRegistry {
    async fn list_clusters(&self, _organization_id: &str) -> Result<Vec<Cluster>, RegistryError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RegistryError::Status {
                status: 503,
                message: "registry down".to_string(),
            });
        }
        Ok(self.clusters.clone())
    }
}
