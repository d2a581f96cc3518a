//! Configuration for the scanner workers
//!
//! CLI arguments and environment variable handling using clap. Every worker
//! binary flattens the shared groups below and adds its own subjects.

use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::WorkerError;

/// NATS connection configuration
#[derive(Args, Debug, Clone)]
pub struct NatsArgs {
    /// Comma-separated list of NATS server URLs
    #[arg(long, env = "NATS_SERVERS", default_value = "nats://localhost:4222")]
    pub nats_servers: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,
}

impl NatsArgs {
    /// Split the server list, dropping blank entries
    pub fn server_list(&self) -> Vec<String> {
        split_list(&self.nats_servers)
    }
}

/// Graph datastore connection configuration
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// MongoDB connection URI
    #[arg(long, env = "DB_URL", default_value = "mongodb://localhost:27017")]
    pub db_url: String,

    /// Database name
    #[arg(long, env = "DB_NAME", default_value = "track_dmarc")]
    pub db_name: String,

    /// Database username (optional)
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password (optional)
    #[arg(long, env = "DB_PASS")]
    pub db_pass: Option<String>,
}

/// Logging configuration
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl LogArgs {
    pub fn json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// DNS scanner worker
///
/// Reconciles DKIM selectors for a requested domain and publishes a DNS scan.
#[derive(Parser, Debug, Clone)]
#[command(name = "dns-scanner")]
#[command(about = "Scans DKIM, DMARC, MX and SPF records for requested domains")]
#[command(version)]
pub struct ScannerArgs {
    /// Client name announced to NATS
    #[arg(long, env = "NAME", default_value = "dns-scanner")]
    pub name: String,

    /// Subject pattern to receive scan requests on
    #[arg(long, env = "SUBSCRIBE_TO", default_value = "domains.*")]
    pub subscribe_to: String,

    /// Subject prefix to publish scan results under
    #[arg(long, env = "PUBLISH_TO", default_value = "domains")]
    pub publish_to: String,

    /// Queue group shared by every scanner instance
    #[arg(long, env = "QUEUE_GROUP", default_value = "dns-scanner")]
    pub queue_group: String,

    /// Upper bound on a single domain scan, in seconds
    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value = "60")]
    pub scan_timeout_secs: u64,

    #[command(flatten)]
    pub nats: NatsArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

impl ScannerArgs {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WorkerError> {
        validate_subjects(&self.subscribe_to, &self.publish_to, &self.queue_group)?;
        validate_servers(&self.nats)?;
        if self.scan_timeout_secs == 0 {
            return Err(WorkerError::Config(
                "SCAN_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Domain discovery worker
///
/// Enumerates subdomains of an organization's domain and admits new ones.
#[derive(Parser, Debug, Clone)]
#[command(name = "domain-discovery")]
#[command(about = "Discovers new subdomains and claims them for the requesting organization")]
#[command(version)]
pub struct DiscoveryArgs {
    /// Client name announced to NATS
    #[arg(long, env = "NAME", default_value = "domain-discovery")]
    pub name: String,

    /// Subject pattern to receive discovery requests on
    #[arg(long, env = "SUBSCRIBE_TO", default_value = "domains.*.discovery")]
    pub subscribe_to: String,

    /// Subject prefix to publish newly admitted domains under
    #[arg(long, env = "PUBLISH_TO", default_value = "domains")]
    pub publish_to: String,

    /// Queue group shared by every discovery instance
    #[arg(long, env = "QUEUE_GROUP", default_value = "domain-discovery")]
    pub queue_group: String,

    /// Directory for the enumeration tool's output files
    #[arg(long, env = "DOMAIN_TXT_PATH", default_value = "/tmp")]
    pub domain_txt_path: PathBuf,

    /// Subdomain enumeration executable
    #[arg(long, env = "FINDOMAIN_BIN", default_value = "findomain")]
    pub findomain_bin: String,

    #[command(flatten)]
    pub nats: NatsArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

impl DiscoveryArgs {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), WorkerError> {
        validate_subjects(&self.subscribe_to, &self.publish_to, &self.queue_group)?;
        validate_servers(&self.nats)?;
        if self.findomain_bin.trim().is_empty() {
            return Err(WorkerError::Config("FINDOMAIN_BIN must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Change alert notifier
///
/// Emails a fixed list of stakeholders when a tracked DNS record changes.
#[derive(Parser, Debug, Clone)]
#[command(name = "change-notifier")]
#[command(about = "Sends asset-change alert emails to configured stakeholders")]
#[command(version)]
pub struct NotifierArgs {
    /// Client name announced to NATS
    #[arg(long, env = "NAME", default_value = "change-notifier")]
    pub name: String,

    /// Subject pattern to receive change alerts on
    #[arg(long, env = "SUBSCRIBE_TO", default_value = "domains.*.asset-change")]
    pub subscribe_to: String,

    /// Queue group shared by every notifier instance
    #[arg(long, env = "QUEUE_GROUP", default_value = "change-notifier")]
    pub queue_group: String,

    /// Comma-separated recipient email addresses
    #[arg(long, env = "ALERT_SUBS", default_value = "")]
    pub alert_subs: String,

    /// Notification template for asset-change alerts
    #[arg(long, env = "NOTIFICATION_ASSET_CHANGE_ALERT_EMAIL")]
    pub template_id: String,

    /// Notification service API key
    #[arg(long, env = "NOTIFICATION_API_KEY")]
    pub notification_api_key: String,

    /// Notification service base URL
    #[arg(
        long,
        env = "NOTIFICATION_API_URL",
        default_value = "https://api.notification.canada.ca"
    )]
    pub notification_api_url: String,

    #[command(flatten)]
    pub nats: NatsArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

impl NotifierArgs {
    pub fn recipients(&self) -> Vec<String> {
        split_list(&self.alert_subs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.subscribe_to.trim().is_empty() || self.queue_group.trim().is_empty() {
            return Err(WorkerError::Config(
                "SUBSCRIBE_TO and QUEUE_GROUP must not be empty".to_string(),
            ));
        }
        validate_servers(&self.nats)?;
        if self.recipients().is_empty() {
            return Err(WorkerError::Config("ALERT_SUBS must list at least one recipient".to_string()));
        }
        if self.template_id.trim().is_empty() {
            return Err(WorkerError::Config(
                "NOTIFICATION_ASSET_CHANGE_ALERT_EMAIL must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_subjects(subscribe_to: &str, publish_to: &str, queue_group: &str) -> Result<(), WorkerError> {
    if subscribe_to.trim().is_empty() {
        return Err(WorkerError::Config("SUBSCRIBE_TO must not be empty".to_string()));
    }
    if publish_to.trim().is_empty() || publish_to.contains(['*', '>']) {
        return Err(WorkerError::Config(
            "PUBLISH_TO must be a literal subject prefix".to_string(),
        ));
    }
    if queue_group.trim().is_empty() {
        return Err(WorkerError::Config("QUEUE_GROUP must not be empty".to_string()));
    }
    Ok(())
}

fn validate_servers(nats: &NatsArgs) -> Result<(), WorkerError> {
    if nats.server_list().is_empty() {
        return Err(WorkerError::Config("NATS_SERVERS must list at least one server".to_string()));
    }
    Ok(())
}
