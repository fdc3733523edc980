//! Unified Logging entities
//!
//! Wire types exchanged between API clients, the coordinator and the
//! per-cluster logging backends, plus the merge engine that turns many
//! partial backend responses into one ordered, identity-grouped response.
//!
//! The coordinator is a pass-through amplifier of a single protocol: a
//! backend answers the same [`SearchRequest`] with the same
//! [`LogResponseList`] shape that the coordinator hands back to its caller.
//!
//! # Modules
//!
//! - [`request`] - Search and expiration requests, filter fields
//! - [`response`] - Response envelope, identity groups and flat log entries
//! - [`merge`] - Flatten, sort, clip and regroup partial results

pub mod merge;
pub mod request;
pub mod response;

pub use merge::{LIMIT_PER_SEARCH, merge};
pub use request::{
    DEFAULT_SEARCH_WINDOW_SECS, ExpirationRequest, FilterFields, LoggingRequest, SearchRequest, Success, is_unset,
};
pub use response::{IdentityKey, LogEntry, LogMessage, LogResponseGroup, LogResponseList, ServiceIdentity};
