//! Response envelope and log entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity labels attached to every log line
///
/// Entries coming from different backends are regrouped by these labels
/// after a merge, so they travel with the data instead of being implied by
/// the backend that returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceIdentity {
    pub organization_id: String,
    pub app_descriptor_id: String,
    pub app_descriptor_name: String,
    pub app_instance_id: String,
    pub app_instance_name: String,
    pub service_group_id: String,
    pub service_group_name: String,
    pub service_group_instance_id: String,
    pub service_id: String,
    pub service_name: String,
    pub service_instance_id: String,
}

impl ServiceIdentity {
    /// Grouping key built from the identifier labels only; names are descriptive
    pub fn key(&self) -> IdentityKey {
        IdentityKey {
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

/// Composite key of an identity group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub organization_id: String,
    pub app_descriptor_id: String,
    pub app_instance_id: String,
    pub service_group_id: String,
    pub service_group_instance_id: String,
    pub service_id: String,
    pub service_instance_id: String,
}

/// A single timestamped line within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub msg: String,
}

/// A flattened log line carrying its full identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub msg: String,
    #[serde(flatten)]
    pub identity: ServiceIdentity,
}

/// Log lines of one identity group, in timestamp order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogResponseGroup {
    #[serde(flatten)]
    pub identity: ServiceIdentity,
    #[serde(default)]
    pub entries: Vec<LogMessage>,
}

impl LogResponseGroup {
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            entries: Vec::new(),
        }
    }
}

/// Response to a search, from a backend or from the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogResponseList {
    pub organization_id: String,

    /// Earliest timestamp covered by `responses`
    pub from: Option<DateTime<Utc>>,

    /// Latest timestamp covered by `responses`
    pub to: Option<DateTime<Utc>>,

    pub responses: Vec<LogResponseGroup>,
}

impl LogResponseList {
    /// Number of log lines across all groups
    pub fn entry_count(&self) -> usize {
        self.responses.iter().map(|group| group.entries.len()).sum()
    }

    /// Flatten every group into entries carrying their group's identity
    pub fn into_entries(self) -> impl Iterator<Item = LogEntry> {
        self.responses.into_iter().flat_map(|group| {
            let identity = group.identity;
            group.entries.into_iter().map(move |message| LogEntry {
                timestamp: message.timestamp,
                msg: message.msg,
                identity: identity.clone(),
            })
        })
    }
}
