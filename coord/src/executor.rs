//! Fan-out executor
//!
//! Runs one unit of work per endpoint, each in its own task, and joins them
//! all before returning. A failing host (connect, call, close, timeout or a
//! panicking call) is recorded and never affects the others.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::client::{ClientError, ClientFactory, ClientParams, LoggingClient};
use crate::error::CoordError;
use crate::resolver::ClusterEndpoint;

/// What one host's work produced
#[derive(Debug)]
pub struct HostOutcome<T> {
    /// Entries affected, added to the total even when `error` is set
    pub count: usize,
    pub value: Option<T>,
    pub error: Option<ClientError>,
}

impl<T> HostOutcome<T> {
    pub fn success(count: usize, value: T) -> Self {
        Self {
            count,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(count: usize, error: ClientError) -> Self {
        Self {
            count,
            value: None,
            error: Some(error),
        }
    }
}

/// Aggregate of a fan-out
#[derive(Debug)]
pub struct ExecSummary<T> {
    pub total: usize,
    /// Ids of failed endpoints, in endpoint order
    pub failed_ids: Vec<String>,
    /// `slots[i]` holds the value produced for `endpoints[i]`
    pub slots: Vec<Option<T>>,
}

struct Report<T> {
    index: usize,
    count: usize,
    value: Option<T>,
    failed: bool,
}

impl<T> Report<T> {
    fn failed(index: usize) -> Self {
        Self {
            index,
            count: 0,
            value: None,
            failed: true,
        }
    }
}

pub struct LoggingExecutor {
    factory: Arc<dyn ClientFactory>,
    params: ClientParams,
    max_concurrent: usize,
}

impl LoggingExecutor {
    /// `max_concurrent` bounds the hosts contacted at once within one fan-out
    pub fn new(factory: Arc<dyn ClientFactory>, params: ClientParams, max_concurrent: usize) -> Self {
        Self {
            factory,
            params,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run `work` once against every endpoint
    ///
    /// Host failures are collected in the summary. An `Err` means the fan-out
    /// itself could not complete.
    pub async fn exec_requests<T, F, Fut>(
        &self,
        endpoints: &[ClusterEndpoint],
        work: F,
    ) -> Result<ExecSummary<T>, CoordError>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn LoggingClient>, ClusterEndpoint, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostOutcome<T>> + Send + 'static,
    {
        debug!(endpoints = endpoints.len(), "LoggingExecutor::exec_requests: called");
        let work = Arc::new(work);
        let limit = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, endpoint) in endpoints.iter().cloned().enumerate() {
            let factory = self.factory.clone();
            let params = self.params.clone();
            let limit = limit.clone();
            let work = work.clone();

            tasks.spawn(async move {
                let _permit = match limit.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(host = %endpoint.host, error = %e, "Executor closed before host ran");
                        return Report::failed(index);
                    }
                };
                run_host(factory.as_ref(), &params, endpoint, index, work.as_ref()).await
            });
        }

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(endpoints.len()).collect();
        let mut reported = vec![false; endpoints.len()];
        let mut failed = vec![false; endpoints.len()];
        let mut total = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    total += report.count;
                    reported[report.index] = true;
                    failed[report.index] = report.failed;
                    slots[report.index] = report.value;
                    debug!(index = report.index, count = report.count, total, "LoggingExecutor::exec_requests: host done");
                }
                Err(e) if e.is_cancelled() => {
                    return Err(CoordError::internal("fan-out task cancelled", e));
                }
                Err(e) => {
                    warn!(error = %e, "Fan-out task failed");
                }
            }
        }

        let failed_ids: Vec<String> = endpoints
            .iter()
            .enumerate()
            .filter(|(i, _)| failed[*i] || !reported[*i])
            .map(|(_, endpoint)| endpoint.id.clone())
            .collect();

        debug!(total, failed = failed_ids.len(), "LoggingExecutor::exec_requests: finished");
        Ok(ExecSummary {
            total,
            failed_ids,
            slots,
        })
    }
}

async fn run_host<T, F, Fut>(
    factory: &dyn ClientFactory,
    params: &ClientParams,
    endpoint: ClusterEndpoint,
    index: usize,
    work: &F,
) -> Report<T>
where
    F: Fn(Arc<dyn LoggingClient>, ClusterEndpoint, usize) -> Fut,
    Fut: Future<Output = HostOutcome<T>>,
{
    let host = endpoint.host.clone();
    debug!(%host, index, "run_host: executing on host");

    let client: Arc<dyn LoggingClient> = match timeout(params.timeout, factory.connect(&host, params)).await {
        Ok(Ok(client)) => Arc::from(client),
        Ok(Err(e)) => {
            warn!(%host, error = %e, "Failed creating connection");
            return Report::failed(index);
        }
        Err(_) => {
            warn!(%host, timeout = ?params.timeout, "Timed out creating connection");
            return Report::failed(index);
        }
    };

    let guard = CloseGuard::new(client.clone(), params.timeout);

    let call = AssertUnwindSafe(work(client, endpoint, index)).catch_unwind();
    let (count, value, failed) = match timeout(params.timeout, call).await {
        Ok(Ok(outcome)) => {
            if let Some(e) = &outcome.error {
                warn!(%host, error = %e, "Failed executing command");
            }
            (outcome.count, outcome.value, outcome.error.is_some())
        }
        Ok(Err(_)) => {
            warn!(%host, "Host call panicked");
            (0, None, true)
        }
        Err(_) => {
            warn!(%host, error = %ClientError::Timeout(params.timeout), "Failed executing command");
            (0, None, true)
        }
    };

    guard.close().await;

    Report {
        index,
        count,
        value,
        failed,
    }
}

/// Closes a connected client, also when the host task is aborted
struct CloseGuard {
    client: Option<Arc<dyn LoggingClient>>,
    timeout: Duration,
}

impl CloseGuard {
    fn new(client: Arc<dyn LoggingClient>, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            timeout,
        }
    }

    async fn close(mut self) {
        if let Some(client) = self.client.take() {
            close_client(client, self.timeout).await;
        }
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        debug!(host = %client.host(), "CloseGuard::drop: host task dropped before close");
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(close_client(client, self.timeout));
        }
    }
}

/// Close errors are logged, never returned
async fn close_client(client: Arc<dyn LoggingClient>, limit: Duration) {
    match timeout(limit, client.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(host = %client.host(), error = %e, "Failed closing connection"),
        Err(_) => warn!(host = %client.host(), "Timed out closing connection"),
    }
}
