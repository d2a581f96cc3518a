//! DNS scanning
//!
//! The scan capability is consumed through [`DomainScanner`]; the
//! [`ScanDispatcher`] bounds it with a timeout and always publishes exactly
//! one result per request.

pub mod dispatcher;
pub mod resolver;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Result;

pub use dispatcher::{ScanDispatcher, ScanOutcome};
pub use resolver::ResolverScanner;

/// Scans a domain's email-security records
#[async_trait]
pub trait DomainScanner: Send + Sync {
    /// Collect DMARC, SPF, MX and DKIM results for `domain`, probing each selector
    async fn scan_domain(&self, domain: &str, dkim_selectors: &[String]) -> Result<Value>;
}
