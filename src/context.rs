//! Process-wide connections
//!
//! Each worker opens one bus connection and one datastore client at startup
//! and closes them once at shutdown. Both handles are cheap to clone.

use tracing::info;

use crate::config::{DatabaseArgs, NatsArgs};
use crate::db::MongoClient;
use crate::graph::MongoGraphStore;
use crate::nats::NatsClient;
use crate::types::Result;

pub struct WorkerContext {
    pub nats: NatsClient,
    pub mongo: MongoClient,
}

impl WorkerContext {
    pub async fn connect(nats: &NatsArgs, database: &DatabaseArgs, name: &str) -> Result<Self> {
        let mongo = MongoClient::new(database, name).await?;
        let nats = NatsClient::connect(nats, name).await?;
        info!("{} connected to NATS and MongoDB", name);
        Ok(Self { nats, mongo })
    }

    /// Graph store over this context's datastore client
    pub async fn graph_store(&self) -> Result<MongoGraphStore> {
        MongoGraphStore::new(&self.mongo).await
    }

    /// Flush the bus and release the datastore pool
    pub async fn close(self) {
        self.nats.close().await;
        self.mongo.shutdown().await;
    }
}
