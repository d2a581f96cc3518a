//! Resolver-backed scanner
//!
//! Gathers the raw DMARC, SPF, MX and DKIM records for a domain. Grading the
//! records is left to the downstream processor.

use async_trait::async_trait;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::DomainScanner;
use crate::types::Result;

/// Scanner issuing TXT and MX queries through the system resolver
#[derive(Clone)]
pub struct ResolverScanner {
    resolver: TokioAsyncResolver,
}

impl ResolverScanner {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    async fn txt_records(&self, name: &str) -> std::result::Result<Vec<String>, ResolveError> {
        let lookup = self.resolver.txt_lookup(name).await?;
        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk))
                    .collect::<String>()
            })
            .collect())
    }

    /// TXT records at `name` that start with `tag` (case-insensitive)
    async fn tagged_txt(&self, name: &str, tag: &str) -> Value {
        match self.txt_records(name).await {
            Ok(records) => {
                let matching: Vec<String> = records
                    .into_iter()
                    .filter(|r| r.to_ascii_lowercase().starts_with(tag))
                    .collect();
                records_or_missing(matching)
            }
            Err(e) => lookup_error(name, &e),
        }
    }

    async fn mx(&self, domain: &str) -> Value {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let hosts: Vec<Value> = lookup
                    .iter()
                    .map(|mx| {
                        json!({
                            "preference": mx.preference(),
                            "hostname": mx.exchange().to_string(),
                        })
                    })
                    .collect();
                if hosts.is_empty() {
                    missing()
                } else {
                    json!({ "hosts": hosts })
                }
            }
            Err(e) => lookup_error(domain, &e),
        }
    }

    async fn dkim(&self, domain: &str, selectors: &[String]) -> Value {
        let mut results = Map::new();
        for selector in selectors {
            let name = format!("{}._domainkey.{}", selector, domain);
            let value = match self.txt_records(&name).await {
                Ok(records) => records_or_missing(records),
                Err(e) => lookup_error(&name, &e),
            };
            results.insert(selector.clone(), value);
        }
        Value::Object(results)
    }
}

#[async_trait]
impl DomainScanner for ResolverScanner {
    async fn scan_domain(&self, domain: &str, dkim_selectors: &[String]) -> Result<Value> {
        let dmarc = self.tagged_txt(&format!("_dmarc.{}", domain), "v=dmarc1").await;
        let spf = self.tagged_txt(domain, "v=spf1").await;
        let mx = self.mx(domain).await;
        let dkim = self.dkim(domain, dkim_selectors).await;

        Ok(json!({
            "dmarc": dmarc,
            "spf": spf,
            "mx": mx,
            "dkim": dkim,
        }))
    }
}

fn missing() -> Value {
    json!({ "error": "missing" })
}

fn records_or_missing(records: Vec<String>) -> Value {
    if records.is_empty() {
        missing()
    } else {
        json!({ "records": records })
    }
}

fn lookup_error(name: &str, err: &ResolveError) -> Value {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => missing(),
        _ => {
            debug!(name, error = %err, "Lookup failed");
            json!({ "error": err.to_string() })
        }
    }
}
