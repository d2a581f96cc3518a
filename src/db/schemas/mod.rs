//! Database schemas for the domain graph
//!
//! Vertex collections: domains, selectors, orgs, dmarcSummaries.
//! Edge collections: claims, domainsToSelectors, domainsToDmarcSummaries.

mod dmarc_summary;
mod domain;
mod edge;
mod org;
mod selector;

pub use dmarc_summary::{DetailTables, DmarcSummaryDoc, FullPassRow, DMARC_SUMMARY_COLLECTION};
pub use domain::{DomainDoc, DomainStatus, DOMAIN_COLLECTION};
pub use edge::{
    ClaimDoc, DmarcSummaryEdge, DomainSelectorEdge, Tag, CLAIM_COLLECTION,
    DMARC_SUMMARY_EDGE_COLLECTION, DOMAIN_SELECTOR_COLLECTION,
};
pub use org::{OrgDetails, OrgDoc, OrgLocale, ORG_COLLECTION};
pub use selector::{SelectorDoc, SELECTOR_COLLECTION, WILDCARD_SELECTOR};
