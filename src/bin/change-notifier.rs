//! Change alert notifier
//!
//! Emails every address in ALERT_SUBS when a tracked DNS record changes.
//! Needs no datastore: the alert carries the organization details.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use scan_fleet::config::NotifierArgs;
use scan_fleet::logging;
use scan_fleet::nats::NatsClient;
use scan_fleet::notify::{NotificationDispatcher, NotifyClient};
use scan_fleet::services::ChangeAlertService;
use scan_fleet::worker::{shutdown_signal, WorkerShell};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = NotifierArgs::parse();
    logging::init(&args.log);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let client = match NotifyClient::new(&args.notification_api_url, &args.notification_api_key) {
        Ok(client) => client,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let recipients = args.recipients();
    info!(
        "Starting {} (subscribe: {}, recipients: {})",
        args.name,
        args.subscribe_to,
        recipients.len()
    );

    let nats = NatsClient::connect(&args.nats, &args.name).await?;
    let service = ChangeAlertService::new(NotificationDispatcher::new(
        Arc::new(client),
        recipients,
        &args.template_id,
    ));

    let shell = WorkerShell::new(nats.clone(), &args.subscribe_to, &args.queue_group);
    let result = shell.run(Arc::new(service), shutdown_signal()).await;

    nats.close().await;
    result?;
    Ok(())
}
