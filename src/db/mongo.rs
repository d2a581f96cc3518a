//! MongoDB client and collection wrapper
//!
//! Collections are laid out as a graph: vertex documents carry `_id` of the
//! form `<collection>/<_key>`, edge documents additionally carry `_from` and
//! `_to`. Uniqueness is enforced by indexes so that insert-if-absent writes
//! stay idempotent under concurrent delivery.

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, Credential, FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::DatabaseArgs;
use crate::types::WorkerError;

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// Trait for schemas stored in a named collection with index definitions
pub trait IntoIndexes {
    const COLLECTION: &'static str;

    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(args: &DatabaseArgs, app_name: &str) -> Result<Self, WorkerError> {
        info!("Connecting to MongoDB database '{}'", args.db_name);

        let mut options = ClientOptions::parse(&args.db_url)
            .await
            .map_err(|e| WorkerError::Database(format!("Invalid DB_URL: {}", e)))?;
        options.app_name = Some(app_name.to_string());
        // Fail fast on an unreachable server instead of hanging startup
        options.server_selection_timeout = Some(Duration::from_secs(3));
        options.connect_timeout = Some(Duration::from_secs(3));

        if let (Some(user), Some(pass)) = (&args.db_user, &args.db_pass) {
            options.credential = Some(
                Credential::builder()
                    .username(user.clone())
                    .password(pass.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options)
            .map_err(|e| WorkerError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(&args.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| WorkerError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", args.db_name);

        Ok(Self {
            client,
            db_name: args.db_name.clone(),
        })
    }

    /// Get a typed collection, applying its indexes
    pub async fn collection<T>(&self) -> Result<MongoCollection<T>, WorkerError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name).await
    }

    /// Close all pooled connections
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("MongoDB connections closed");
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Open the collection and apply indexes
    pub async fn new(client: &Client, db_name: &str) -> Result<Self, WorkerError> {
        let collection = client.database(db_name).collection::<T>(T::COLLECTION);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), WorkerError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner.create_indexes(indices).await.map_err(|e| {
            WorkerError::Database(format!("Failed to create indexes on {}: {}", T::COLLECTION, e))
        })?;

        debug!("Indexes applied to {}", T::COLLECTION);
        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, WorkerError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| WorkerError::Database(format!("Find in {} failed: {}", T::COLLECTION, e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, WorkerError> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| WorkerError::Database(format!("Find in {} failed: {}", T::COLLECTION, e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| WorkerError::Database(format!("Reading {} failed: {}", T::COLLECTION, e)))
    }

    /// Find the first document matching `filter` in `sort` order
    pub async fn find_first(&self, filter: Document, sort: Document) -> Result<Option<T>, WorkerError> {
        self.inner
            .find_one(filter)
            .sort(sort)
            .await
            .map_err(|e| WorkerError::Database(format!("Find in {} failed: {}", T::COLLECTION, e)))
    }

    /// Insert `item` unless a document matching `filter` already exists.
    ///
    /// Returns the pre-existing document, or `None` when `item` was inserted.
    /// Two writers racing on the same unique key can make one upsert fail
    /// with a duplicate key error; that write is retried once, at which point
    /// it observes the winner's document.
    pub async fn insert_if_absent(&self, filter: Document, item: &T) -> Result<Option<T>, WorkerError> {
        let update = doc! { "$setOnInsert": bson::to_document(item)? };

        match self.upsert_returning_previous(filter.clone(), update.clone()).await {
            Err(e) if is_duplicate_key(&e) => {
                warn!("Upsert race on {}, retrying", T::COLLECTION);
                self.upsert_returning_previous(filter, update)
                    .await
                    .map_err(|e| WorkerError::Database(format!("Upsert into {} failed: {}", T::COLLECTION, e)))
            }
            other => other.map_err(|e| {
                WorkerError::Database(format!("Upsert into {} failed: {}", T::COLLECTION, e))
            }),
        }
    }

    async fn upsert_returning_previous(
        &self,
        filter: Document,
        update: Document,
    ) -> mongodb::error::Result<Option<T>> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .build();

        self.inner
            .find_one_and_update(filter, update)
            .with_options(options)
            .await
    }
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Unique index options with a stable name
pub fn unique_index(name: &str) -> Option<IndexOptions> {
    Some(
        IndexOptions::builder()
            .unique(true)
            .name(name.to_string())
            .build(),
    )
}

/// Plain index options with a stable name
pub fn named_index(name: &str) -> Option<IndexOptions> {
    Some(IndexOptions::builder().name(name.to_string()).build())
}
