//! In-memory graph store
//!
//! Mirrors the uniqueness guarantees of the MongoDB indexes: each
//! insert-if-absent runs under one write lock, so concurrent callers observe
//! exactly one insertion per unique key.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{new_key, GraphStore, Upserted};
use crate::db::schemas::{ClaimDoc, DmarcSummaryDoc, DomainDoc, DomainSelectorEdge, SelectorDoc};
use crate::types::Result;

#[derive(Default)]
struct GraphState {
    /// Domains by hostname
    domains: HashMap<String, DomainDoc>,
    /// Selectors by value
    selectors: HashMap<String, SelectorDoc>,
    domain_selectors: Vec<DomainSelectorEdge>,
    claims: Vec<ClaimDoc>,
    /// DMARC summaries by domain id, with the period start date
    summaries: HashMap<String, Vec<(Option<String>, DmarcSummaryDoc)>>,
}

/// Process-local graph store
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a domain directly, as the API would
    pub async fn insert_domain(&self, hostname: &str) -> DomainDoc {
        self.find_or_insert_domain(hostname)
            .await
            .map(|u| u.doc)
            .unwrap_or_else(|_| DomainDoc::new(new_key(), hostname.to_string()))
    }

    /// Attach a DMARC summary to a domain
    pub async fn add_dmarc_summary(&self, domain_id: &str, start_date: &str, summary: DmarcSummaryDoc) {
        self.state
            .write()
            .await
            .summaries
            .entry(domain_id.to_string())
            .or_default()
            .push((Some(start_date.to_string()), summary));
    }

    pub async fn domain_count(&self) -> usize {
        self.state.read().await.domains.len()
    }

    pub async fn selector_count(&self) -> usize {
        self.state.read().await.selectors.len()
    }

    pub async fn domain_selector_edge_count(&self) -> usize {
        self.state.read().await.domain_selectors.len()
    }

    pub async fn claims(&self) -> Vec<ClaimDoc> {
        self.state.read().await.claims.clone()
    }

    /// Selector values tracked for a hostname, sorted
    pub async fn selectors_for(&self, hostname: &str) -> Vec<String> {
        let state = self.state.read().await;
        let Some(domain) = state.domains.get(hostname) else {
            return Vec::new();
        };

        let mut values: Vec<String> = state
            .domain_selectors
            .iter()
            .filter(|e| e.from == domain.id)
            .filter_map(|e| state.selectors.values().find(|s| s.id == e.to))
            .map(|s| s.selector.clone())
            .collect();
        values.sort();
        values
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn find_domain(&self, hostname: &str) -> Result<Option<DomainDoc>> {
        Ok(self.state.read().await.domains.get(hostname).cloned())
    }

    async fn tracked_selectors(&self, domain_id: &str) -> Result<Vec<SelectorDoc>> {
        let state = self.state.read().await;
        let ids: HashSet<&str> = state
            .domain_selectors
            .iter()
            .filter(|e| e.from == domain_id || e.to == domain_id)
            .map(|e| e.other_end(domain_id))
            .collect();

        Ok(state
            .selectors
            .values()
            .filter(|s| ids.contains(s.id.as_str()))
            .cloned()
            .collect())
    }

    async fn summary_selector_entries(&self, domain_id: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let latest = state
            .summaries
            .get(domain_id)
            .and_then(|summaries| summaries.iter().max_by(|a, b| a.0.cmp(&b.0)));

        Ok(latest.map(|(_, s)| s.selector_entries()).unwrap_or_default())
    }

    async fn upsert_selector(&self, selector: &str) -> Result<Upserted<SelectorDoc>> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.selectors.get(selector) {
            return Ok(Upserted::existing(existing.clone()));
        }

        let doc = SelectorDoc::new(new_key(), selector.to_string());
        state.selectors.insert(selector.to_string(), doc.clone());
        Ok(Upserted::created(doc))
    }

    async fn link_selector(&self, domain_id: &str, selector_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state
            .domain_selectors
            .iter()
            .any(|e| e.from == domain_id && e.to == selector_id)
        {
            return Ok(false);
        }

        state
            .domain_selectors
            .push(DomainSelectorEdge::new(new_key(), domain_id, selector_id));
        Ok(true)
    }

    async fn claimed_domains(&self, org_id: &str) -> Result<HashSet<String>> {
        let state = self.state.read().await;
        let ids: HashSet<&str> = state
            .claims
            .iter()
            .filter(|c| c.from == org_id)
            .map(|c| c.to.as_str())
            .collect();

        Ok(state
            .domains
            .values()
            .filter(|d| ids.contains(d.id.as_str()))
            .map(|d| d.domain.clone())
            .collect())
    }

    async fn find_or_insert_domain(&self, hostname: &str) -> Result<Upserted<DomainDoc>> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.domains.get(hostname) {
            return Ok(Upserted::existing(existing.clone()));
        }

        let doc = DomainDoc::new(new_key(), hostname.to_string());
        state.domains.insert(hostname.to_string(), doc.clone());
        Ok(Upserted::created(doc))
    }

    async fn claim_domain(&self, org_id: &str, domain_id: &str) -> Result<Upserted<ClaimDoc>> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .claims
            .iter()
            .find(|c| c.from == org_id && c.to == domain_id)
        {
            return Ok(Upserted::existing(existing.clone()));
        }

        let claim = ClaimDoc::discovered(new_key(), org_id, domain_id);
        state.claims.push(claim.clone());
        Ok(Upserted::created(claim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{DetailTables, FullPassRow};

    fn summary(id: &str, selectors: &[&str]) -> DmarcSummaryDoc {
        DmarcSummaryDoc {
            id: id.to_string(),
            detail_tables: DetailTables {
                full_pass: selectors
                    .iter()
                    .map(|s| FullPassRow {
                        dkim_selectors: Some(s.to_string()),
                    })
                    .collect(),
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_selector_is_idempotent() {
        let store = InMemoryGraphStore::new();

        let first = store.upsert_selector("sel1").await.unwrap();
        let second = store.upsert_selector("sel1").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.doc.id, second.doc.id);
        assert_eq!(store.selector_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_selector_upserts_insert_once() {
        let store = InMemoryGraphStore::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert_selector("google").await.unwrap() })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.selector_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_domain_inserts_insert_once() {
        let store = InMemoryGraphStore::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.find_or_insert_domain("a.gc.ca").await.unwrap() })
            })
            .collect();

        let mut ids = HashSet::new();
        let mut created = 0;
        for handle in handles {
            let upserted = handle.await.unwrap();
            if upserted.created {
                created += 1;
            }
            ids.insert(upserted.doc.id);
        }

        assert_eq!(created, 1);
        assert_eq!(ids.len(), 1);
        assert_eq!(store.domain_count().await, 1);
    }

    #[tokio::test]
    async fn test_link_selector_never_duplicates_edge() {
        let store = InMemoryGraphStore::new();
        let domain = store.insert_domain("example.org").await;
        let selector = store.upsert_selector("sel1").await.unwrap().doc;

        assert!(store.link_selector(&domain.id, &selector.id).await.unwrap());
        assert!(!store.link_selector(&domain.id, &selector.id).await.unwrap());

        assert_eq!(store.domain_selector_edge_count().await, 1);
        assert_eq!(store.selectors_for("example.org").await, vec!["sel1"]);
    }

    #[tokio::test]
    async fn test_latest_summary_wins() {
        let store = InMemoryGraphStore::new();
        let domain = store.insert_domain("example.org").await;

        store
            .add_dmarc_summary(&domain.id, "2024-01-01", summary("dmarcSummaries/old", &["old"]))
            .await;
        store
            .add_dmarc_summary(&domain.id, "2024-03-01", summary("dmarcSummaries/new", &["a,b"]))
            .await;

        let entries = store.summary_selector_entries(&domain.id).await.unwrap();
        assert_eq!(entries, vec!["a,b"]);
    }

    #[tokio::test]
    async fn test_claimed_domains_are_scoped_to_org() {
        let store = InMemoryGraphStore::new();
        let a = store.insert_domain("a.gc.ca").await;
        let b = store.insert_domain("b.gc.ca").await;

        store.claim_domain("orgs/5", &a.id).await.unwrap();
        store.claim_domain("orgs/6", &b.id).await.unwrap();
        let again = store.claim_domain("orgs/5", &a.id).await.unwrap();

        assert!(!again.created);
        let claimed = store.claimed_domains("orgs/5").await.unwrap();
        assert_eq!(claimed, HashSet::from(["a.gc.ca".to_string()]));
        assert_eq!(store.claims().await.len(), 2);
    }
}
