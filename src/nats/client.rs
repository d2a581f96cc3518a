//! NATS client wrapper
//!
//! Provides connection management with reconnection and lifecycle logging,
//! queue-group subscriptions, and JSON publishing.

use async_nats::{Client, ConnectOptions, Event, Subscriber};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::NatsArgs;
use crate::types::{Result, WorkerError};

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// Publishes payloads to bus subjects
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;
}

/// Serialize `payload` as JSON and publish it
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn Publisher,
    subject: &str,
    payload: &T,
) -> Result<()> {
    let body = serde_json::to_vec(payload)?;
    publisher.publish(subject, Bytes::from(body)).await
}

/// NATS client wrapper
#[derive(Clone)]
pub struct NatsClient {
    /// Underlying NATS client
    client: Client,
    /// Client name for logging
    name: String,
}

impl NatsClient {
    /// Connect to the configured servers.
    ///
    /// Reconnects indefinitely after a drop; connection state transitions are
    /// logged from the event callback.
    pub async fn connect(args: &NatsArgs, name: &str) -> Result<Self> {
        let servers = args.server_list();
        info!("Connecting to NATS at {}", servers.join(","));

        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5))
            .retry_on_initial_connect()
            .max_reconnects(None::<usize>)
            .event_callback(|event| async move {
                match event {
                    Event::Connected => info!("Connected to NATS"),
                    Event::Disconnected => warn!("Disconnected from NATS, reconnecting"),
                    Event::ServerError(e) => error!("NATS server error: {}", e),
                    Event::ClientError(e) => error!("NATS client error: {}", e),
                    Event::SlowConsumer(sid) => warn!("NATS slow consumer on subscription {}", sid),
                    other => info!("NATS event: {}", other),
                }
            });

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(servers.as_slice())
            .await
            .map_err(|e| WorkerError::Nats(format!("Failed to connect: {}", e)))?;

        info!("NATS client '{}' ready", name);

        Ok(Self {
            client,
            name: name.to_string(),
        })
    }

    /// Subscribe under a queue group so each message reaches one member
    pub async fn queue_subscribe(&self, subject: &str, queue_group: &str) -> Result<Subscriber> {
        self.client
            .queue_subscribe(subject.to_string(), queue_group.to_string())
            .await
            .map_err(|e| WorkerError::Nats(format!("Subscribe to {} failed: {}", subject, e)))
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| WorkerError::Nats(format!("Flush failed: {}", e)))
    }

    /// Flush outstanding publishes and release this handle.
    ///
    /// The connection closes once the last clone is dropped.
    pub async fn close(self) {
        if let Err(e) = self.flush().await {
            warn!("Final flush for '{}' failed: {}", self.name, e);
        }
        info!("Connection to NATS is closed");
    }
}

#[async_trait]
impl Publisher for NatsClient {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| WorkerError::Nats(format!("Publish to {} failed: {}", subject, e)))
    }
}
