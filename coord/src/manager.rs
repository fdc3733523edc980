//! Search and expire coordination
//!
//! The [`Manager`] resolves the organization's endpoints, fans the request
//! out through the [`LoggingExecutor`] and, for searches, merges whatever
//! came back. It keeps no state between calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use unified_logging_entities::{ExpirationRequest, LogResponseList, SearchRequest, Success, merge};
use uuid::Uuid;

use crate::error::CoordError;
use crate::executor::{HostOutcome, LoggingExecutor};
use crate::resolver::HostResolver;

#[async_trait]
pub trait SearchManager: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<LogResponseList, CoordError>;
}

#[async_trait]
pub trait ExpireManager: Send + Sync {
    async fn expire(&self, request: ExpirationRequest) -> Result<Success, CoordError>;
}

pub struct Manager {
    resolver: HostResolver,
    executor: LoggingExecutor,
    limit_per_search: usize,
}

impl Manager {
    pub fn new(resolver: HostResolver, executor: LoggingExecutor, limit_per_search: usize) -> Self {
        Self {
            resolver,
            executor,
            limit_per_search,
        }
    }
}

#[async_trait]
impl SearchManager for Manager {
    async fn search(&self, request: SearchRequest) -> Result<LogResponseList, CoordError> {
        let request_id = Uuid::now_v7().to_string();
        debug!(%request_id, organization_id = %request.organization_id, "Manager::search: called");

        let endpoints = self.resolver.get_hosts(&request.filter_fields()).await?;

        let request = Arc::new(request.with_default_window(Utc::now()));
        let shared = request.clone();
        let summary = self
            .executor
            .exec_requests(&endpoints, move |client, _endpoint, _index| {
                let request = shared.clone();
                async move {
                    match client.search(&request).await {
                        Ok(list) => HostOutcome::success(list.entry_count(), list),
                        Err(e) => HostOutcome::failure(0, e),
                    }
                }
            })
            .await?;

        if !summary.failed_ids.is_empty() {
            warn!(%request_id, failed_ids = ?summary.failed_ids, "Search incomplete, some clusters failed");
        }

        let response = merge(&request.organization_id, &request, summary.slots, self.limit_per_search);
        info!(
            %request_id,
            hosts = endpoints.len(),
            total = summary.total,
            returned = response.entry_count(),
            "Search finished"
        );
        Ok(response)
    }
}

#[async_trait]
impl ExpireManager for Manager {
    async fn expire(&self, request: ExpirationRequest) -> Result<Success, CoordError> {
        let request_id = Uuid::now_v7().to_string();
        debug!(%request_id, organization_id = %request.organization_id, "Manager::expire: called");

        let endpoints = self.resolver.get_hosts(&request.filter_fields()).await?;

        let request = Arc::new(request);
        let shared = request.clone();
        let summary = self
            .executor
            .exec_requests(&endpoints, move |client, _endpoint, _index| {
                let request = shared.clone();
                async move {
                    match client.expire(&request).await {
                        Ok(success) => HostOutcome::success(0, success),
                        Err(e) => HostOutcome::failure(0, e),
                    }
                }
            })
            .await?;

        if !summary.failed_ids.is_empty() {
            warn!(%request_id, failed_ids = ?summary.failed_ids, "Expire incomplete, some clusters failed");
        }
        info!(%request_id, hosts = endpoints.len(), failed = summary.failed_ids.len(), "Expire finished");
        Ok(Success {})
    }
}
