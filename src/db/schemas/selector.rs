//! DKIM selector vertex schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{unique_index, IntoIndexes};

/// Collection name for selectors
pub const SELECTOR_COLLECTION: &str = "selectors";

/// Wildcard selector probed for every domain
pub const WILDCARD_SELECTOR: &str = "*";

/// Selector document, unique by value
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key")]
    pub key: String,

    pub selector: String,
}

impl SelectorDoc {
    pub fn new(key: String, selector: String) -> Self {
        Self {
            id: format!("{}/{}", SELECTOR_COLLECTION, key),
            key,
            selector,
        }
    }
}

impl IntoIndexes for SelectorDoc {
    const COLLECTION: &'static str = SELECTOR_COLLECTION;

    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(doc! { "selector": 1 }, unique_index("selector_unique"))]
    }
}
