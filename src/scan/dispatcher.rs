//! Scan dispatch
//!
//! Runs the scanner under a deadline and publishes the outcome to
//! `<publish_to>.<domain_key>.dns`. A timed-out or failed scan still
//! publishes an envelope with every sub-check set to `{"error": "missing"}`,
//! so requesters always observe one terminal response.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::DomainScanner;
use crate::db::schemas::DomainDoc;
use crate::nats::messages::scan_result_subject;
use crate::nats::{publish_json, Publisher, ScanRequest, ScanResultMessage};
use crate::types::{Result, WorkerError};

/// How a dispatched scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Scanner returned results in time
    Completed,
    /// Scanner exceeded its deadline; placeholder results were published
    TimedOut,
    /// Scanner failed; placeholder results were published
    Failed,
}

/// Invokes the scanner and publishes its result
pub struct ScanDispatcher {
    scanner: Arc<dyn DomainScanner>,
    publisher: Arc<dyn Publisher>,
    publish_to: String,
    timeout: Duration,
}

impl ScanDispatcher {
    pub fn new(
        scanner: Arc<dyn DomainScanner>,
        publisher: Arc<dyn Publisher>,
        publish_to: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            scanner,
            publisher,
            publish_to: publish_to.into(),
            timeout,
        }
    }

    /// Scan `domain` with `selectors` and publish exactly one result.
    ///
    /// Only a failure to publish is returned as an error.
    pub async fn dispatch(
        &self,
        request: &ScanRequest,
        domain: &DomainDoc,
        selectors: &[String],
    ) -> Result<ScanOutcome> {
        info!(
            "Scanning {} with DKIM selectors {:?}",
            domain.domain, selectors
        );

        let (message, outcome) = match self.run_scan(&domain.domain, selectors).await {
            Ok(results) => (
                ScanResultMessage::new(request, &domain.key, results),
                ScanOutcome::Completed,
            ),
            Err(WorkerError::Timeout(_)) => {
                error!("Timeout while scanning {}", domain.domain);
                (
                    ScanResultMessage::missing(request, &domain.key),
                    ScanOutcome::TimedOut,
                )
            }
            Err(e) => {
                warn!("Scan of {} failed, publishing missing results: {}", domain.domain, e);
                (
                    ScanResultMessage::missing(request, &domain.key),
                    ScanOutcome::Failed,
                )
            }
        };

        let subject = scan_result_subject(&self.publish_to, &domain.key);
        publish_json(self.publisher.as_ref(), &subject, &message).await?;

        info!(subject = %subject, ?outcome, "Published DNS scan result for {}", domain.domain);
        Ok(outcome)
    }

    async fn run_scan(&self, domain: &str, selectors: &[String]) -> Result<Value> {
        tokio::time::timeout(self.timeout, self.scanner.scan_domain(domain, selectors)).await?
    }
}
