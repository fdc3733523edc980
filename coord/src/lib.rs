//! Unified logging coordinator
//!
//! Serves `Search` and `Expire` for an organization by fanning each request
//! out to the logging backend of every serving application cluster, then
//! merging the partial answers into one time-ordered response.
//!
//! The request path is
//! [`server`] → [`handler::Handler`] → [`manager::Manager`] →
//! [`resolver::HostResolver`] + [`executor::LoggingExecutor`] → merge.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod handler;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod service;

pub use config::Config;
pub use error::{CoordError, ErrorKind};
pub use manager::{ExpireManager, Manager, SearchManager};
pub use service::Service;
