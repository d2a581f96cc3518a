//! Domain vertex schema

use bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::mongo::{named_index, unique_index, IntoIndexes};

/// Collection name for domains
pub const DOMAIN_COLLECTION: &str = "domains";

/// Last result per check; every field stays null until the first scan.
///
/// Values are written by the result processors, so any shape is accepted.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DomainStatus {
    #[serde(default)]
    pub certificates: Option<Bson>,
    #[serde(default)]
    pub dkim: Option<Bson>,
    #[serde(default)]
    pub dmarc: Option<Bson>,
    #[serde(default)]
    pub https: Option<Bson>,
    #[serde(default)]
    pub spf: Option<Bson>,
    #[serde(default)]
    pub ssl: Option<Bson>,
}

/// Domain document
///
/// Only `_id`, `_key` and `domain` are relied on here. The remaining fields
/// are owned by other pipelines and are read leniently.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_key")]
    pub key: String,

    /// Hostname, unique across the collection
    pub domain: String,

    /// When the domain was last scanned
    #[serde(default)]
    pub last_ran: Option<Bson>,

    /// Legacy selector list, superseded by `domainsToSelectors` edges
    #[serde(default, deserialize_with = "null_as_default")]
    pub selectors: Vec<Bson>,

    #[serde(default)]
    pub hash: Option<Bson>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: DomainStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub archived: bool,
}

impl DomainDoc {
    /// A never-scanned domain as first written by discovery
    pub fn new(key: String, domain: String) -> Self {
        Self {
            id: format!("{}/{}", DOMAIN_COLLECTION, key),
            key,
            domain,
            last_ran: None,
            selectors: Vec::new(),
            hash: None,
            status: DomainStatus::default(),
            archived: false,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl IntoIndexes for DomainDoc {
    const COLLECTION: &'static str = DOMAIN_COLLECTION;

    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "domain": 1 }, unique_index("domain_unique")),
            (doc! { "_key": 1 }, named_index("key_index")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_serializes_null_status() {
        let doc = DomainDoc::new("123".into(), "a.gc.ca".into());
        let bson = bson::to_document(&doc).unwrap();

        assert_eq!(bson.get_str("_id").unwrap(), "domains/123");
        assert!(bson.get("lastRan").unwrap().as_null().is_some());
        assert!(!bson.get_bool("archived").unwrap());

        let status = bson.get_document("status").unwrap();
        for check in ["certificates", "dkim", "dmarc", "https", "spf", "ssl"] {
            assert!(status.get(check).unwrap().as_null().is_some(), "{check}");
        }
    }

    #[test]
    fn test_fields_written_elsewhere_are_read_leniently() {
        let stored = doc! {
            "_id": "domains/7",
            "_key": "7",
            "domain": "a.gc.ca",
            "lastRan": "2024-05-01 12:00:00.000000",
            "selectors": null,
            "hash": 12345,
            "status": { "dkim": "pass", "https": { "grade": "A" }, "ssl": null },
            "archived": null,
        };

        let domain: DomainDoc = bson::from_document(stored).unwrap();

        assert_eq!(domain.id, "domains/7");
        assert_eq!(domain.domain, "a.gc.ca");
        assert!(domain.selectors.is_empty());
        assert!(!domain.archived);
        assert_eq!(domain.status.dkim, Some(Bson::String("pass".into())));
    }

    #[test]
    fn test_null_status_reads_as_default() {
        let stored = doc! { "_id": "domains/8", "_key": "8", "domain": "b.gc.ca", "status": null };

        let domain: DomainDoc = bson::from_document(stored).unwrap();
        assert_eq!(domain.status, DomainStatus::default());
    }
}
