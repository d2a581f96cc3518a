//! Bus message payloads and subject helpers
//!
//! | Purpose            | Subject                  | Payload                  |
//! |--------------------|--------------------------|--------------------------|
//! | Scan request       | `domains.*`              | [`ScanRequest`]          |
//! | Scan result        | `domains.<key>.dns`      | [`ScanResultMessage`]    |
//! | Discovery request  | `domains.*.discovery`    | [`DiscoveryRequest`]     |
//! | Discovery result   | `domains.<key>`          | [`DiscoveredDomain`]     |
//! | Change alert       | `domains.*.asset-change` | [`ChangeAlert`]          |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::schemas::OrgDoc;

/// Scan type tag carried by every DNS scan result
pub const DNS_SCAN_TYPE: &str = "dns";

/// Sub-checks substituted with an error marker when a scan produces nothing
pub const DNS_SUB_CHECKS: [&str; 4] = ["dmarc", "spf", "mx", "dkim"];

/// Request to scan one domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRequest {
    pub domain: String,
    #[serde(default)]
    pub user_key: Option<String>,
    #[serde(default)]
    pub shared_id: Option<String>,
}

/// Result of one DNS scan, real or synthesized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResultMessage {
    pub results: Value,
    pub domain: String,
    pub scan_type: String,
    pub user_key: Option<String>,
    pub domain_key: String,
    pub shared_id: Option<String>,
}

impl ScanResultMessage {
    pub fn new(request: &ScanRequest, domain_key: &str, results: Value) -> Self {
        Self {
            results,
            domain: request.domain.clone(),
            scan_type: DNS_SCAN_TYPE.to_string(),
            user_key: request.user_key.clone(),
            domain_key: domain_key.to_string(),
            shared_id: request.shared_id.clone(),
        }
    }

    /// Envelope whose every sub-check reports `{"error": "missing"}`
    pub fn missing(request: &ScanRequest, domain_key: &str) -> Self {
        Self::new(request, domain_key, missing_results())
    }
}

/// `{"dmarc": {"error": "missing"}, ...}` for every DNS sub-check
pub fn missing_results() -> Value {
    let checks: serde_json::Map<String, Value> = DNS_SUB_CHECKS
        .iter()
        .map(|check| (check.to_string(), json!({ "error": "missing" })))
        .collect();
    Value::Object(checks)
}

/// Request to discover subdomains of a root domain for an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub domain: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
}

/// A newly admitted domain, handed on to the scanners
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveredDomain {
    pub domain: String,
    pub selectors: Vec<String>,
    pub domain_key: String,
}

impl DiscoveredDomain {
    pub fn new(domain: &str, domain_key: &str) -> Self {
        Self {
            domain: domain.to_string(),
            selectors: Vec::new(),
            domain_key: domain_key.to_string(),
        }
    }
}

/// A tracked DNS record changed value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeAlert {
    pub domain: String,
    pub record_type: String,
    pub org: OrgDoc,
    #[serde(default)]
    pub prev_val: Value,
    #[serde(default)]
    pub current_val: Value,
}

/// `<prefix>.<domain_key>.dns`
pub fn scan_result_subject(prefix: &str, domain_key: &str) -> String {
    format!("{}.{}.{}", prefix, domain_key, DNS_SCAN_TYPE)
}

/// `<prefix>.<domain_key>`
pub fn discovery_result_subject(prefix: &str, domain_key: &str) -> String {
    format!("{}.{}", prefix, domain_key)
}
