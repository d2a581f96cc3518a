//! Selector reconciliation
//!
//! Merges the selectors already tracked for a domain with those observed in
//! its latest DMARC summary (plus the wildcard), keeps only candidates whose
//! `<selector>._domainkey.<domain>` name resolves, and records them as
//! selector vertices linked to the domain.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::schemas::{DomainDoc, WILDCARD_SELECTOR};
use crate::dns::LivenessProbe;
use crate::graph::GraphStore;
use crate::types::{Result, WorkerError};

/// A domain with its selector set after reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledDomain {
    pub domain: DomainDoc,
    /// Every tracked selector, including ones added by this pass
    pub selectors: Vec<String>,
    /// Selectors newly linked by this pass
    pub added: Vec<String>,
}

/// Brings a domain's tracked selectors up to date before a scan
pub struct SelectorReconciler {
    store: Arc<dyn GraphStore>,
    probe: Arc<dyn LivenessProbe>,
}

impl SelectorReconciler {
    pub fn new(store: Arc<dyn GraphStore>, probe: Arc<dyn LivenessProbe>) -> Self {
        Self { store, probe }
    }

    /// Reconcile `hostname`.
    ///
    /// Returns [`WorkerError::NotFound`] when the domain is not in the graph.
    /// Any store failure aborts the pass; links written before it remain.
    pub async fn reconcile(&self, hostname: &str) -> Result<ReconciledDomain> {
        let domain = self
            .store
            .find_domain(hostname)
            .await?
            .ok_or_else(|| WorkerError::NotFound(format!("Domain '{}' not found in DB", hostname)))?;

        let mut selectors: Vec<String> = self
            .store
            .tracked_selectors(&domain.id)
            .await?
            .into_iter()
            .map(|s| s.selector)
            .collect();

        let entries = self.store.summary_selector_entries(&domain.id).await?;
        let candidates = candidate_selectors(&entries, &selectors);
        debug!(domain = %domain.domain, ?candidates, "Selector candidates");

        let mut added = Vec::new();
        for candidate in candidates {
            let probe_name = format!("{}._domainkey.{}", candidate, domain.domain);
            if !self.probe.is_live(&probe_name).await {
                debug!("Skipping selector '{}': {} does not resolve", candidate, probe_name);
                continue;
            }

            let selector = self.store.upsert_selector(&candidate).await?.doc;
            self.store.link_selector(&domain.id, &selector.id).await?;

            info!(
                "Inserted new domain/selector connection for domain '{}' and selector '{}'",
                domain.domain, candidate
            );
            selectors.push(candidate.clone());
            added.push(candidate);
        }

        Ok(ReconciledDomain {
            domain,
            selectors,
            added,
        })
    }
}

/// Flatten comma-joined summary entries, add the wildcard, and drop
/// blanks and already-tracked selectors.
pub fn candidate_selectors(summary_entries: &[String], tracked: &[String]) -> BTreeSet<String> {
    summary_entries
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .chain(std::iter::once(WILDCARD_SELECTOR))
        .filter(|s| !s.is_empty())
        .filter(|s| !tracked.iter().any(|t| t == s))
        .map(str::to_string)
        .collect()
}
