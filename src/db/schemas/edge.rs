//! Edge schemas
//!
//! Every edge collection has a unique `(_from, _to)` index, so inserting an
//! edge that already exists is a no-op rather than a duplicate.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{named_index, unique_index, IntoIndexes};

/// Edge collection Org -> Domain
pub const CLAIM_COLLECTION: &str = "claims";

/// Edge collection Domain -> Selector
pub const DOMAIN_SELECTOR_COLLECTION: &str = "domainsToSelectors";

/// Edge collection Domain -> DmarcSummary
pub const DMARC_SUMMARY_EDGE_COLLECTION: &str = "domainsToDmarcSummaries";

fn edge_indices(prefix: &str) -> Vec<(Document, Option<IndexOptions>)> {
    vec![
        (
            doc! { "_from": 1, "_to": 1 },
            unique_index(&format!("{}_from_to_unique", prefix)),
        ),
        (doc! { "_to": 1 }, named_index(&format!("{}_to_index", prefix))),
    ]
}

/// Bilingual label attached to a claim
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub en: String,
    pub fr: String,
}

impl Tag {
    /// Tag applied to every claim created by discovery
    pub fn new_discovery() -> Self {
        Self {
            en: "NEW".to_string(),
            fr: "NOUVEAU".to_string(),
        }
    }
}

/// Claim edge: the organization is responsible for the domain
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key")]
    pub key: String,

    #[serde(rename = "_from")]
    pub from: String,

    #[serde(rename = "_to")]
    pub to: String,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ClaimDoc {
    /// Visible claim tagged as newly discovered
    pub fn discovered(key: String, org_id: &str, domain_id: &str) -> Self {
        Self {
            id: format!("{}/{}", CLAIM_COLLECTION, key),
            key,
            from: org_id.to_string(),
            to: domain_id.to_string(),
            hidden: false,
            tags: vec![Tag::new_discovery()],
        }
    }
}

impl IntoIndexes for ClaimDoc {
    const COLLECTION: &'static str = CLAIM_COLLECTION;

    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        edge_indices("claims")
    }
}

/// Domain -> Selector edge; existence means the selector is tracked
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainSelectorEdge {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key")]
    pub key: String,

    #[serde(rename = "_from")]
    pub from: String,

    #[serde(rename = "_to")]
    pub to: String,
}

impl DomainSelectorEdge {
    pub fn new(key: String, domain_id: &str, selector_id: &str) -> Self {
        Self {
            id: format!("{}/{}", DOMAIN_SELECTOR_COLLECTION, key),
            key,
            from: domain_id.to_string(),
            to: selector_id.to_string(),
        }
    }

    /// The vertex at the other end of the edge from `vertex_id`
    pub fn other_end(&self, vertex_id: &str) -> &str {
        if self.from == vertex_id {
            &self.to
        } else {
            &self.from
        }
    }
}

impl IntoIndexes for DomainSelectorEdge {
    const COLLECTION: &'static str = DOMAIN_SELECTOR_COLLECTION;

    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        edge_indices("domains_to_selectors")
    }
}

/// Domain -> DmarcSummary edge, written by the DMARC report pipeline
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DmarcSummaryEdge {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key", default)]
    pub key: String,

    #[serde(rename = "_from")]
    pub from: String,

    #[serde(rename = "_to")]
    pub to: String,

    /// First day of the summarized period, `YYYY-MM-DD`
    #[serde(default)]
    pub start_date: Option<String>,
}

impl IntoIndexes for DmarcSummaryEdge {
    const COLLECTION: &'static str = DMARC_SUMMARY_EDGE_COLLECTION;

    /// Owned by the DMARC report pipeline; opened read-only here
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}
