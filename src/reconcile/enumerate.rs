//! Subdomain enumeration
//!
//! The enumeration tool runs as a child process and writes one hostname per
//! line to an output file. Its exit status is reported but never fatal: the
//! caller reads whatever output exists.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// How an enumeration run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationOutcome {
    Completed,
    /// Tool could not be started or exited unsuccessfully
    ToolFailed(String),
}

/// Discovers subdomains of a root domain
#[async_trait]
pub trait Enumerator: Send + Sync {
    /// Enumerate subdomains of `root`, writing them line by line to `output`
    async fn enumerate(&self, root: &str, output: &Path) -> EnumerationOutcome;
}

/// `findomain` child-process enumerator
#[derive(Debug, Clone)]
pub struct FindomainEnumerator {
    binary: String,
}

impl FindomainEnumerator {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Enumerator for FindomainEnumerator {
    async fn enumerate(&self, root: &str, output: &Path) -> EnumerationOutcome {
        debug!(binary = %self.binary, root, output = %output.display(), "Running subdomain enumeration");

        let result = Command::new(&self.binary)
            .arg("-t")
            .arg(root)
            .arg("-u")
            .arg(output)
            .arg("-q")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => EnumerationOutcome::Completed,
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let reason = format!("{} exited with {}: {}", self.binary, out.status, stderr.trim());
                warn!(root, "{}", reason);
                EnumerationOutcome::ToolFailed(reason)
            }
            Err(e) => {
                let reason = format!("failed to start {}: {}", self.binary, e);
                warn!(root, "{}", reason);
                EnumerationOutcome::ToolFailed(reason)
            }
        }
    }
}
