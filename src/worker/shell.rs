//! Bus worker shell
//!
//! Owns the queue-group subscription and runs one task per delivered
//! message. Handler failures are logged here and never end the loop. On
//! shutdown the subscription is dropped first, then in-flight handlers are
//! allowed to finish before the connection is closed.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::nats::NatsClient;
use crate::types::{Result, WorkerError};

/// One message as handed to a handler
#[derive(Debug, Clone)]
pub struct Delivery {
    pub subject: String,
    pub reply: Option<String>,
    pub payload: Bytes,
}

impl Delivery {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            payload: payload.into(),
        }
    }

    /// Decode the JSON payload
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| WorkerError::BadRequest(format!("Malformed payload on {}: {}", self.subject, e)))
    }
}

impl From<async_nats::Message> for Delivery {
    fn from(message: async_nats::Message) -> Self {
        Self {
            subject: message.subject.to_string(),
            reply: message.reply.map(|r| r.to_string()),
            payload: message.payload,
        }
    }
}

/// Handles one delivered message
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, delivery: Delivery) -> Result<()>;
}

/// Counters for one serve loop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl ServeStats {
    fn record(&mut self, joined: std::result::Result<bool, tokio::task::JoinError>) {
        match joined {
            Ok(true) => self.succeeded += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                error!("Message handler task aborted: {}", e);
                self.panicked += 1;
            }
        }
    }
}

/// Worker bound to one subject under one queue group
pub struct WorkerShell {
    nats: NatsClient,
    subject: String,
    queue_group: String,
}

impl WorkerShell {
    pub fn new(nats: NatsClient, subject: impl Into<String>, queue_group: impl Into<String>) -> Self {
        Self {
            nats,
            subject: subject.into(),
            queue_group: queue_group.into(),
        }
    }

    /// Subscribe and serve `handler` until `shutdown` resolves
    pub async fn run<F>(self, handler: Arc<dyn MessageHandler>, shutdown: F) -> Result<ServeStats>
    where
        F: Future<Output = ()> + Send,
    {
        let subscriber = self
            .nats
            .queue_subscribe(&self.subject, &self.queue_group)
            .await?;

        info!(
            "{} listening on '{}' in queue group '{}'",
            handler.name(),
            self.subject,
            self.queue_group
        );

        let stats = serve(subscriber.map(Delivery::from), handler, shutdown).await;

        info!(
            received = stats.received,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Worker stopped"
        );
        Ok(stats)
    }
}

/// Dispatch every delivery to its own task until the stream ends or
/// `shutdown` resolves, then wait for the in-flight tasks.
///
/// The stream is dropped before waiting, which unsubscribes from the bus.
pub async fn serve<S, F>(deliveries: S, handler: Arc<dyn MessageHandler>, shutdown: F) -> ServeStats
where
    S: Stream<Item = Delivery> + Send,
    F: Future<Output = ()> + Send,
{
    let mut deliveries = Box::pin(deliveries);
    let mut shutdown = std::pin::pin!(shutdown);
    let mut tasks = JoinSet::new();
    let mut stats = ServeStats::default();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting messages");
                break;
            }
            next = deliveries.next() => match next {
                Some(delivery) => {
                    stats.received += 1;
                    let handler = Arc::clone(&handler);
                    tasks.spawn(handle_one(handler, delivery));
                }
                None => {
                    warn!("Subscription closed");
                    break;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => stats.record(joined),
        }
    }

    drop(deliveries);

    if !tasks.is_empty() {
        info!("Waiting for {} in-flight message(s)", tasks.len());
    }
    while let Some(joined) = tasks.join_next().await {
        stats.record(joined);
    }

    stats
}

async fn handle_one(handler: Arc<dyn MessageHandler>, delivery: Delivery) -> bool {
    let subject = delivery.subject.clone();
    debug!(
        "Received a message on '{} {}': {}",
        subject,
        delivery.reply.as_deref().unwrap_or(""),
        String::from_utf8_lossy(&delivery.payload)
    );

    match handler.handle(delivery).await {
        Ok(()) => true,
        Err(e) => {
            error!(
                handler = handler.name(),
                subject = %subject,
                transient = e.is_transient(),
                "Message dropped: {}",
                e
            );
            false
        }
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Got signal SIGINT: exit"),
        _ = terminate => info!("Got signal SIGTERM: exit"),
    }
}
