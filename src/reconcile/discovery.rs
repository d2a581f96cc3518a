//! Discovery reconciliation
//!
//! Enumerates subdomains of a root domain and admits the live ones that the
//! requesting organization does not already claim. Admission is
//! find-or-insert of the domain followed by an insert-if-absent claim, so a
//! replayed request converges on the same graph.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::enumerate::{EnumerationOutcome, Enumerator};
use crate::db::schemas::DomainDoc;
use crate::dns::LivenessProbe;
use crate::graph::{new_key, GraphStore};
use crate::types::{Result, WorkerError};

pub struct DiscoveryReconciler {
    store: Arc<dyn GraphStore>,
    probe: Arc<dyn LivenessProbe>,
    enumerator: Arc<dyn Enumerator>,
    transient_dir: PathBuf,
}

impl DiscoveryReconciler {
    pub fn new(
        store: Arc<dyn GraphStore>,
        probe: Arc<dyn LivenessProbe>,
        enumerator: Arc<dyn Enumerator>,
        transient_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            probe,
            enumerator,
            transient_dir: transient_dir.into(),
        }
    }

    /// Fresh output file for one enumeration of `root`.
    ///
    /// Concurrent requests for the same root each get their own file.
    fn output_path(&self, root: &str) -> PathBuf {
        self.transient_dir.join(format!("{}.{}.txt", root, new_key()))
    }

    /// Discover subdomains of `root` for `org_id`.
    ///
    /// Returns every domain that this call inserted or newly claimed. The
    /// transient output file is removed whether or not admission succeeds.
    pub async fn discover(&self, root: &str, org_id: &str) -> Result<Vec<DomainDoc>> {
        validate_root(root)?;
        let path = self.output_path(root);

        match self.enumerator.enumerate(root, &path).await {
            EnumerationOutcome::Completed => debug!(root, "Enumeration completed"),
            EnumerationOutcome::ToolFailed(reason) => {
                let err = WorkerError::ExternalTool(reason);
                warn!(root, error = %err, "Reading any partial enumeration output")
            }
        }

        let result = self.admit(root, org_id, &path).await;
        remove_transient(&path).await;
        result
    }

    async fn admit(&self, root: &str, org_id: &str, path: &Path) -> Result<Vec<DomainDoc>> {
        let candidates = match read_candidates(path).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(root, path = %path.display(), "No enumeration output: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut claimed: HashSet<String> = self.store.claimed_domains(org_id).await?;
        let mut admitted = Vec::new();

        for candidate in candidates {
            if claimed.contains(&candidate) {
                debug!("Skipping '{}': already claimed by {}", candidate, org_id);
                continue;
            }
            if !self.probe.is_live(&candidate).await {
                debug!("Skipping '{}': does not resolve", candidate);
                continue;
            }

            let domain = self.store.find_or_insert_domain(&candidate).await?;
            let claim = self.store.claim_domain(org_id, &domain.doc.id).await?;

            if domain.created || claim.created {
                info!(
                    "Admitted discovered domain '{}' for {} (inserted: {}, claimed: {})",
                    candidate, org_id, domain.created, claim.created
                );
                admitted.push(domain.doc);
            }
            claimed.insert(candidate);
        }

        info!(root, org_id, count = admitted.len(), "Discovery complete");
        Ok(admitted)
    }
}

/// Reject roots that would escape the transient directory or read as a
/// flag to the enumeration tool
pub fn validate_root(root: &str) -> Result<()> {
    if root.trim().is_empty()
        || root.starts_with('-')
        || root.contains('/')
        || root.contains('\\')
        || root.contains("..")
    {
        return Err(WorkerError::BadRequest(format!("Invalid root domain '{}'", root)));
    }
    Ok(())
}

/// Non-blank, trimmed lines of the enumeration output
async fn read_candidates(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn remove_transient(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed enumeration output"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No enumeration output to remove")
        }
        Err(e) => warn!(path = %path.display(), "Failed to remove enumeration output: {}", e),
    }
}
