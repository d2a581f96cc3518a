//! MongoDB-backed graph store

use async_trait::async_trait;
use bson::doc;
use std::collections::HashSet;
use tracing::debug;

use super::{new_key, GraphStore, Upserted};
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    ClaimDoc, DmarcSummaryDoc, DmarcSummaryEdge, DomainDoc, DomainSelectorEdge, SelectorDoc,
};
use crate::types::Result;

/// Graph store over MongoDB collections
#[derive(Clone)]
pub struct MongoGraphStore {
    domains: MongoCollection<DomainDoc>,
    selectors: MongoCollection<SelectorDoc>,
    claims: MongoCollection<ClaimDoc>,
    domain_selectors: MongoCollection<DomainSelectorEdge>,
    summary_edges: MongoCollection<DmarcSummaryEdge>,
    summaries: MongoCollection<DmarcSummaryDoc>,
}

impl MongoGraphStore {
    /// Open every collection, creating the uniqueness indexes the upserts rely on
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            domains: client.collection().await?,
            selectors: client.collection().await?,
            claims: client.collection().await?,
            domain_selectors: client.collection().await?,
            summary_edges: client.collection().await?,
            summaries: client.collection().await?,
        })
    }
}

#[async_trait]
impl GraphStore for MongoGraphStore {
    async fn find_domain(&self, hostname: &str) -> Result<Option<DomainDoc>> {
        self.domains.find_one(doc! { "domain": hostname }).await
    }

    async fn tracked_selectors(&self, domain_id: &str) -> Result<Vec<SelectorDoc>> {
        let edges = self
            .domain_selectors
            .find_many(doc! { "$or": [ { "_from": domain_id }, { "_to": domain_id } ] })
            .await?;

        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = edges.iter().map(|e| e.other_end(domain_id)).collect();
        self.selectors.find_many(doc! { "_id": { "$in": ids } }).await
    }

    async fn summary_selector_entries(&self, domain_id: &str) -> Result<Vec<String>> {
        let latest = self
            .summary_edges
            .find_first(
                doc! { "$or": [ { "_from": domain_id }, { "_to": domain_id } ] },
                doc! { "startDate": -1, "_key": -1 },
            )
            .await?;

        let Some(edge) = latest else {
            return Ok(Vec::new());
        };

        let summary_id = if edge.from == domain_id { edge.to.as_str() } else { edge.from.as_str() };
        let summary = self.summaries.find_one(doc! { "_id": summary_id }).await?;

        Ok(summary.map(|s| s.selector_entries()).unwrap_or_default())
    }

    async fn upsert_selector(&self, selector: &str) -> Result<Upserted<SelectorDoc>> {
        let candidate = SelectorDoc::new(new_key(), selector.to_string());
        let previous = self
            .selectors
            .insert_if_absent(doc! { "selector": selector }, &candidate)
            .await?;

        Ok(match previous {
            Some(existing) => Upserted::existing(existing),
            None => {
                debug!(selector, "Inserted selector");
                Upserted::created(candidate)
            }
        })
    }

    async fn link_selector(&self, domain_id: &str, selector_id: &str) -> Result<bool> {
        let edge = DomainSelectorEdge::new(new_key(), domain_id, selector_id);
        let previous = self
            .domain_selectors
            .insert_if_absent(doc! { "_from": domain_id, "_to": selector_id }, &edge)
            .await?;

        Ok(previous.is_none())
    }

    async fn claimed_domains(&self, org_id: &str) -> Result<HashSet<String>> {
        let claims = self.claims.find_many(doc! { "_from": org_id }).await?;
        if claims.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<&str> = claims.iter().map(|c| c.to.as_str()).collect();
        let domains = self.domains.find_many(doc! { "_id": { "$in": ids } }).await?;

        Ok(domains.into_iter().map(|d| d.domain).collect())
    }

    async fn find_or_insert_domain(&self, hostname: &str) -> Result<Upserted<DomainDoc>> {
        let candidate = DomainDoc::new(new_key(), hostname.to_string());
        let previous = self
            .domains
            .insert_if_absent(doc! { "domain": hostname }, &candidate)
            .await?;

        Ok(match previous {
            Some(existing) => Upserted::existing(existing),
            None => Upserted::created(candidate),
        })
    }

    async fn claim_domain(&self, org_id: &str, domain_id: &str) -> Result<Upserted<ClaimDoc>> {
        let candidate = ClaimDoc::discovered(new_key(), org_id, domain_id);
        let previous = self
            .claims
            .insert_if_absent(doc! { "_from": org_id, "_to": domain_id }, &candidate)
            .await?;

        Ok(match previous {
            Some(existing) => Upserted::existing(existing),
            None => Upserted::created(candidate),
        })
    }
}
