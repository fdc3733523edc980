//! Mock logging clients for testing

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use unified_logging_entities::{ExpirationRequest, LogResponseList, SearchRequest, Success};

use super::{ClientError, ClientFactory, ClientParams, LoggingClient};

#[derive(Default)]
struct MockState {
    unreachable: HashSet<String>,
    search_results: HashMap<String, LogResponseList>,
    search_failures: HashSet<String>,
    expire_failures: HashSet<String>,
    close_failures: HashSet<String>,
    panics: HashSet<String>,
    delays: HashMap<String, Duration>,

    connects: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    searches: Mutex<Vec<(String, SearchRequest)>>,
    expires: Mutex<Vec<(String, ExpirationRequest)>>,
}

/// Factory handing out [`MockClient`]s with scripted per-host behavior
#[derive(Clone, Default)]
pub struct MockClientFactory {
    state: Arc<MockState>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut MockState {
        Arc::get_mut(&mut self.state).expect("configure mock before sharing it")
    }

    /// `connect` to this host fails
    pub fn unreachable(mut self, host: &str) -> Self {
        self.state_mut().unreachable.insert(host.to_string());
        self
    }

    /// `search` on this host returns `response`
    pub fn with_search_result(mut self, host: &str, response: LogResponseList) -> Self {
        self.state_mut().search_results.insert(host.to_string(), response);
        self
    }

    pub fn failing_search(mut self, host: &str) -> Self {
        self.state_mut().search_failures.insert(host.to_string());
        self
    }

    pub fn failing_expire(mut self, host: &str) -> Self {
        self.state_mut().expire_failures.insert(host.to_string());
        self
    }

    pub fn failing_close(mut self, host: &str) -> Self {
        self.state_mut().close_failures.insert(host.to_string());
        self
    }

    /// Calls on this host panic
    pub fn panicking(mut self, host: &str) -> Self {
        self.state_mut().panics.insert(host.to_string());
        self
    }

    /// Calls on this host sleep before answering
    pub fn with_delay(mut self, host: &str, delay: Duration) -> Self {
        self.state_mut().delays.insert(host.to_string(), delay);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<(String, SearchRequest)> {
        self.state.searches.lock().unwrap().clone()
    }

    pub fn expires(&self) -> Vec<(String, ExpirationRequest)> {
        self.state.expires.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn connect(&self, host: &str, _params: &ClientParams) -> Result<Box<dyn LoggingClient>, ClientError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.unreachable.contains(host) {
            return Err(ClientError::Backend {
                status: 503,
                message: format!("{host} unreachable"),
            });
        }
        Ok(Box::new(MockClient {
            host: host.to_string(),
            state: self.state.clone(),
        }))
    }
}

/// Client produced by [`MockClientFactory`]
pub struct MockClient {
    host: String,
    state: Arc<MockState>,
}

impl MockClient {
    async fn enter(&self) {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.state.delays.get(&self.host) {
            tokio::time::sleep(*delay).await;
        }
        if self.state.panics.contains(&self.host) {
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("mock client for {} panicked", self.host);
        }
    }

    fn leave(&self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn failure(&self, call: &str) -> ClientError {
        ClientError::Backend {
            status: 500,
            message: format!("{call} failed on {}", self.host),
        }
    }
}

#[async_trait]
impl LoggingClient for MockClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn search(&self, request: &SearchRequest) -> Result<LogResponseList, ClientError> {
        self.enter().await;
        self.state
            .searches
            .lock()
            .unwrap()
            .push((self.host.clone(), request.clone()));
        self.leave();

        if self.state.search_failures.contains(&self.host) {
            return Err(self.failure("search"));
        }
        Ok(self.state.search_results.get(&self.host).cloned().unwrap_or_default())
    }

    async fn expire(&self, request: &ExpirationRequest) -> Result<Success, ClientError> {
        self.enter().await;
        self.state
            .expires
            .lock()
            .unwrap()
            .push((self.host.clone(), request.clone()));
        self.leave();

        if self.state.expire_failures.contains(&self.host) {
            return Err(self.failure("expire"));
        }
        Ok(Success {})
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.close_failures.contains(&self.host) {
            return Err(self.failure("close"));
        }
        Ok(())
    }
}
