//! DMARC summary vertex schema
//!
//! Only the fields the selector reconciler reads are modelled; everything
//! else in a summary is ignored on deserialization.

use bson::Document;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for DMARC summaries
pub const DMARC_SUMMARY_COLLECTION: &str = "dmarcSummaries";

/// One row of the fully-passing detail table
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FullPassRow {
    /// Comma-joined selectors observed for this row
    #[serde(default)]
    pub dkim_selectors: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetailTables {
    #[serde(default)]
    pub full_pass: Vec<FullPassRow>,
}

/// DMARC summary document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DmarcSummaryDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub detail_tables: DetailTables,
}

impl DmarcSummaryDoc {
    /// Raw `dkimSelectors` values of every fully-passing row
    pub fn selector_entries(&self) -> Vec<String> {
        self.detail_tables
            .full_pass
            .iter()
            .filter_map(|row| row.dkim_selectors.clone())
            .collect()
    }
}

impl IntoIndexes for DmarcSummaryDoc {
    const COLLECTION: &'static str = DMARC_SUMMARY_COLLECTION;

    // Owned by the DMARC report pipeline
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}
