//! Domain discovery worker
//!
//! Runs subdomain enumeration for each discovery request and admits live,
//! unclaimed subdomains for the requesting organization.
//!
//! Environment variables:
//!   SUBSCRIBE_TO - Request subject pattern (default: domains.*.discovery)
//!   PUBLISH_TO - Subject prefix for admitted domains (default: domains)
//!   QUEUE_GROUP - Queue group (default: domain-discovery)
//!   DOMAIN_TXT_PATH - Directory for enumeration output (default: /tmp)
//!   FINDOMAIN_BIN - Enumeration executable (default: findomain)

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use scan_fleet::config::DiscoveryArgs;
use scan_fleet::dns::DnsProbe;
use scan_fleet::reconcile::{DiscoveryReconciler, FindomainEnumerator};
use scan_fleet::services::DomainDiscoveryService;
use scan_fleet::worker::{shutdown_signal, WorkerShell};
use scan_fleet::{logging, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = DiscoveryArgs::parse();
    logging::init(&args.log);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting {} (subscribe: {}, enumeration: {}, output dir: {})",
        args.name,
        args.subscribe_to,
        args.findomain_bin,
        args.domain_txt_path.display()
    );

    let context = WorkerContext::connect(&args.nats, &args.database, &args.name).await?;
    let store = Arc::new(context.graph_store().await?);

    let reconciler = DiscoveryReconciler::new(
        store,
        Arc::new(DnsProbe::from_system_conf()?),
        Arc::new(FindomainEnumerator::new(&args.findomain_bin)),
        args.domain_txt_path.clone(),
    );
    let service = DomainDiscoveryService::new(reconciler, Arc::new(context.nats.clone()), &args.publish_to);

    let shell = WorkerShell::new(context.nats.clone(), &args.subscribe_to, &args.queue_group);
    let result = shell.run(Arc::new(service), shutdown_signal()).await;

    context.close().await;
    result?;
    Ok(())
}
