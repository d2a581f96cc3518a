//! Organization vertex schema (read-only for the workers)

use serde::{Deserialize, Serialize};

/// Collection name for organizations
pub const ORG_COLLECTION: &str = "orgs";

/// Localized organization naming
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrgLocale {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub acronym: String,
}

/// Bilingual organization details
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrgDetails {
    #[serde(default)]
    pub en: OrgLocale,
    #[serde(default)]
    pub fr: OrgLocale,
}

/// Organization document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrgDoc {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "_key", default)]
    pub key: String,

    #[serde(default)]
    pub org_details: OrgDetails,
}
