//! Liveness probing
//!
//! A hostname is live when an A query for it gets an answer, or when the
//! name exists but has no A records (NOERROR/NODATA). NXDOMAIN, SERVFAIL,
//! timeouts and malformed names all count as not live.

use async_trait::async_trait;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, trace};

use crate::types::{Result, WorkerError};

/// Maximum length of a full hostname
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of one label
const MAX_LABEL_LEN: usize = 63;

/// Answers whether a hostname currently resolves
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_live(&self, hostname: &str) -> bool;
}

/// Liveness probe backed by the system resolver configuration
#[derive(Clone)]
pub struct DnsProbe {
    resolver: TokioAsyncResolver,
}

impl DnsProbe {
    /// Build from `/etc/resolv.conf` (or the platform equivalent)
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| WorkerError::Dns(format!("Failed to read resolver config: {}", e)))?;
        Ok(Self { resolver })
    }

    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TokioAsyncResolver {
        &self.resolver
    }
}

#[async_trait]
impl LivenessProbe for DnsProbe {
    async fn is_live(&self, hostname: &str) -> bool {
        if !is_valid_hostname(hostname) {
            debug!(hostname, "Not probing malformed hostname");
            return false;
        }

        match self.resolver.ipv4_lookup(hostname).await {
            Ok(_) => true,
            Err(e) => {
                let live = exists_without_records(&e);
                trace!(hostname, live, error = %e, "A lookup failed");
                live
            }
        }
    }
}

/// NOERROR with an empty answer section: the name exists
fn exists_without_records(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound { response_code, .. } if *response_code == ResponseCode::NoError
    )
}

/// Syntactic hostname check, so obviously bad names never reach the resolver
pub fn is_valid_hostname(hostname: &str) -> bool {
    let name = hostname.strip_suffix('.').unwrap_or(hostname);
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*')
    })
}
