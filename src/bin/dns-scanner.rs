//! DNS scanner worker
//!
//! Subscribes to scan requests, brings the domain's DKIM selectors up to
//! date, and publishes one scan result per request.
//!
//! Usage:
//!   dns-scanner --nats-servers nats://localhost:4222 --db-url mongodb://localhost:27017
//!
//! Environment variables:
//!   NATS_SERVERS - Comma-separated NATS server URLs
//!   SUBSCRIBE_TO - Request subject pattern (default: domains.*)
//!   PUBLISH_TO - Result subject prefix (default: domains)
//!   QUEUE_GROUP - Queue group (default: dns-scanner)
//!   SCAN_TIMEOUT_SECS - Per-scan deadline (default: 60)
//!   DB_URL, DB_NAME, DB_USER, DB_PASS - Graph datastore

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use scan_fleet::config::ScannerArgs;
use scan_fleet::dns::DnsProbe;
use scan_fleet::reconcile::SelectorReconciler;
use scan_fleet::scan::{ResolverScanner, ScanDispatcher};
use scan_fleet::services::DnsScanService;
use scan_fleet::worker::{shutdown_signal, WorkerShell};
use scan_fleet::{logging, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = ScannerArgs::parse();
    logging::init(&args.log);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting {} (subscribe: {}, publish: {}, timeout: {}s)",
        args.name, args.subscribe_to, args.publish_to, args.scan_timeout_secs
    );

    let context = WorkerContext::connect(&args.nats, &args.database, &args.name).await?;
    let store = Arc::new(context.graph_store().await?);
    let probe = DnsProbe::from_system_conf()?;
    let scanner = ResolverScanner::new(probe.resolver().clone());

    let service = DnsScanService::new(
        SelectorReconciler::new(store, Arc::new(probe)),
        ScanDispatcher::new(
            Arc::new(scanner),
            Arc::new(context.nats.clone()),
            args.publish_to.clone(),
            args.scan_timeout(),
        ),
    );

    let shell = WorkerShell::new(context.nats.clone(), &args.subscribe_to, &args.queue_group);
    let result = shell.run(Arc::new(service), shutdown_signal()).await;

    context.close().await;
    result?;
    Ok(())
}
