//! Search and expiration requests

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Look-back applied to searches that carry neither a `from` nor a `to` bound
pub const DEFAULT_SEARCH_WINDOW_SECS: i64 = 60 * 60;

/// A time bound is unset when it is absent or sits exactly at the Unix epoch
pub fn is_unset(bound: Option<DateTime<Utc>>) -> bool {
    bound.is_none_or(|t| t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0)
}

/// Fields shared by every request that targets an organization's logs
///
/// Lets request validation treat search and expiration requests alike.
pub trait LoggingRequest {
    fn organization_id(&self) -> &str;
    fn app_instance_id(&self) -> Option<&str>;
}

/// Search for log entries matching a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Organization owning the logs (required)
    pub organization_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_descriptor_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_instance_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_group_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_group_instance_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,

    /// Message text filter, wildcards allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_filter: Option<String>,

    /// Inclusive lower bound, unset means unbounded
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound, unset means unbounded
    pub to: Option<DateTime<Utc>>,

    /// Keep the earliest entries instead of the latest when the result is clipped
    pub n_first: bool,
}

impl SearchRequest {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Default::default()
        }
    }

    /// True when neither bound is set
    pub fn is_unranged(&self) -> bool {
        is_unset(self.from) && is_unset(self.to)
    }

    /// Bound an unranged search to the hour preceding `now`
    ///
    /// Requests carrying at least one bound are returned untouched.
    pub fn with_default_window(mut self, now: DateTime<Utc>) -> Self {
        if self.is_unranged() {
            let from = now - Duration::seconds(DEFAULT_SEARCH_WINDOW_SECS);
            debug!(organization_id = %self.organization_id, %from, "SearchRequest::with_default_window: bounding unranged search");
            self.from = Some(from);
            self.to = None;
        }
        self
    }

    /// Scoping fields used to resolve target hosts
    pub fn filter_fields(&self) -> FilterFields {
        FilterFields {
            organization_id: self.organization_id.clone(),
            app_descriptor_id: self.app_descriptor_id.clone(),
            app_instance_id: self.app_instance_id.clone(),
            service_group_id: self.service_group_id.clone(),
            service_group_instance_id: self.service_group_instance_id.clone(),
            service_id: self.service_id.clone(),
            service_instance_id: self.service_instance_id.clone(),
        }
    }
}

impl LoggingRequest for SearchRequest {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }

    fn app_instance_id(&self) -> Option<&str> {
        self.app_instance_id.as_deref()
    }
}

/// Expire the logs of an organization, optionally a single application instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationRequest {
    pub organization_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_instance_id: Option<String>,
}

impl ExpirationRequest {
    pub fn new(organization_id: impl Into<String>, app_instance_id: Option<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            app_instance_id,
        }
    }

    pub fn filter_fields(&self) -> FilterFields {
        FilterFields {
            organization_id: self.organization_id.clone(),
            app_instance_id: self.app_instance_id.clone(),
            ..Default::default()
        }
    }
}

impl LoggingRequest for ExpirationRequest {
    fn organization_id(&self) -> &str {
        &self.organization_id
    }

    fn app_instance_id(&self) -> Option<&str> {
        self.app_instance_id.as_deref()
    }
}

/// Generic acknowledgment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Success {}

/// Identity scope of a request, handed to host resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterFields {
    pub organization_id: String,
    pub app_descriptor_id: Option<String>,
    pub app_instance_id: Option<String>,
    pub service_group_id: Option<String>,
    pub service_group_instance_id: Option<String>,
    pub service_id: Option<String>,
    pub service_instance_id: Option<String>,
}
