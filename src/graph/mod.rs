//! Graph store gateway
//!
//! Typed reads and idempotent writes over the domain graph. Every write is
//! insert-if-absent, so replaying a message after a partial failure never
//! duplicates a vertex or an edge.
//!
//! Two backends implement [`GraphStore`]:
//! - [`MongoGraphStore`]: collections and unique indexes in MongoDB
//! - [`InMemoryGraphStore`]: process-local maps, used by tests

mod memory;
mod mongo_store;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::db::schemas::{ClaimDoc, DomainDoc, SelectorDoc, ORG_COLLECTION};
use crate::types::{Result, WorkerError};

pub use memory::InMemoryGraphStore;
pub use mongo_store::MongoGraphStore;

/// Outcome of an insert-if-absent write
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    /// The stored document (pre-existing or freshly inserted)
    pub doc: T,
    /// Whether this call inserted it
    pub created: bool,
}

impl<T> Upserted<T> {
    pub fn created(doc: T) -> Self {
        Self { doc, created: true }
    }

    pub fn existing(doc: T) -> Self {
        Self {
            doc,
            created: false,
        }
    }
}

/// Typed access to the domain graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up a domain by hostname
    async fn find_domain(&self, hostname: &str) -> Result<Option<DomainDoc>>;

    /// Selectors linked to the domain by a `domainsToSelectors` edge, either direction
    async fn tracked_selectors(&self, domain_id: &str) -> Result<Vec<SelectorDoc>>;

    /// Raw comma-joined `dkimSelectors` entries of the domain's most recent DMARC summary
    async fn summary_selector_entries(&self, domain_id: &str) -> Result<Vec<String>>;

    /// Insert the selector unless one with the same value exists
    async fn upsert_selector(&self, selector: &str) -> Result<Upserted<SelectorDoc>>;

    /// Insert the domain -> selector edge unless it exists; true when inserted
    async fn link_selector(&self, domain_id: &str, selector_id: &str) -> Result<bool>;

    /// Hostnames of every domain the organization claims
    async fn claimed_domains(&self, org_id: &str) -> Result<HashSet<String>>;

    /// Return the domain with this hostname, inserting a never-scanned one if absent
    async fn find_or_insert_domain(&self, hostname: &str) -> Result<Upserted<DomainDoc>>;

    /// Insert a discovery claim org -> domain unless one exists
    async fn claim_domain(&self, org_id: &str, domain_id: &str) -> Result<Upserted<ClaimDoc>>;
}

/// Fresh document key
pub fn new_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Normalize an organization reference to its vertex id.
///
/// Accepts either `orgs/<key>` or a bare key.
pub fn org_vertex_id(raw: &str) -> Result<String> {
    let raw = raw.trim();
    match raw.split_once('/') {
        None if !raw.is_empty() => Ok(format!("{}/{}", ORG_COLLECTION, raw)),
        Some((collection, key)) if collection == ORG_COLLECTION && !key.is_empty() && !key.contains('/') => {
            Ok(raw.to_string())
        }
        _ => Err(WorkerError::BadRequest(format!("Invalid organization id '{}'", raw))),
    }
}
