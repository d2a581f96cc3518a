//! scan-fleet - NATS workers for subdomain discovery and DNS posture scanning
//!
//! Each worker binary subscribes one handler to the bus under a queue group:
//!
//! - **dns-scanner**: reconciles a domain's tracked DKIM selectors against
//!   its latest DMARC summary, scans it, and publishes the result
//! - **domain-discovery**: enumerates subdomains of an organization's domain
//!   and admits live, unclaimed ones into the graph
//! - **change-notifier**: emails stakeholders when a tracked record changes
//!
//! Graph state lives in MongoDB as vertex and edge collections; every write
//! is insert-if-absent so redelivered messages never duplicate state.

pub mod config;
pub mod context;
pub mod db;
pub mod dns;
pub mod graph;
pub mod logging;
pub mod nats;
pub mod notify;
pub mod reconcile;
pub mod scan;
pub mod services;
pub mod types;
pub mod worker;

pub use context::WorkerContext;
pub use types::{Result, WorkerError};
