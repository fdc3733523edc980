//! Request validation and dispatch

use std::sync::Arc;

use tracing::debug;
use unified_logging_entities::{ExpirationRequest, LogResponseList, LoggingRequest, SearchRequest, Success};

use crate::error::CoordError;
use crate::manager::{ExpireManager, SearchManager};

const EMPTY_ORGANIZATION_ID: &str = "organization_id cannot be empty";

/// Common checks for every inbound request
pub fn validate(request: &dyn LoggingRequest) -> Result<(), CoordError> {
    debug!(
        organization_id = request.organization_id(),
        app_instance_id = ?request.app_instance_id(),
        "validate: validating incoming request"
    );
    if request.organization_id().is_empty() {
        return Err(CoordError::invalid_argument(EMPTY_ORGANIZATION_ID));
    }
    Ok(())
}

/// Validates requests before handing them to the managers
#[derive(Clone)]
pub struct Handler {
    search: Arc<dyn SearchManager>,
    expire: Arc<dyn ExpireManager>,
}

impl Handler {
    pub fn new(search: Arc<dyn SearchManager>, expire: Arc<dyn ExpireManager>) -> Self {
        Self { search, expire }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<LogResponseList, CoordError> {
        validate(&request)?;
        self.search.search(request).await
    }

    pub async fn expire(&self, request: ExpirationRequest) -> Result<Success, CoordError> {
        validate(&request)?;
        self.expire.expire(request).await
    }
}
