use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::{self, Document, doc},
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        METADATA_COLLECTION_NAME, MongoMetadataDocument, MongoStateDocument,
        STATE_COLLECTION_NAME, doc_id,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{MatchMetadata, MatchState, StoredMatch},
    storage::StorageResult,
};

/// MongoDB-backed [`GameStore`] keeping state and metadata in two collections.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Held so the connection pool lives as long as the database handle.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    /// Load one raw document and decode it, reporting shape mismatches as
    /// [`MongoDaoError::Decode`] rather than as driver failures.
    async fn load<T>(&self, collection: &'static str, match_id: &str) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let raw = self
            .collection::<Document>(collection)
            .await
            .find_one(doc_id(match_id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection,
                match_id: match_id.to_owned(),
                source,
            })?;

        raw.map(|document| decode_document(collection, match_id, document))
            .transpose()
    }

    async fn fetch(&self, match_id: &str) -> MongoResult<Option<StoredMatch>> {
        let Some(state) = self
            .load::<MongoStateDocument>(STATE_COLLECTION_NAME, match_id)
            .await?
        else {
            return Ok(None);
        };
        let Some(metadata) = self
            .load::<MongoMetadataDocument>(METADATA_COLLECTION_NAME, match_id)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(StoredMatch {
            state: state.into_state()?,
            metadata: metadata.into(),
        }))
    }

    async fn set_state(&self, match_id: &str, state: MatchState) -> MongoResult<()> {
        let document = MongoStateDocument::from_state(match_id, state)?;
        self.collection::<MongoStateDocument>(STATE_COLLECTION_NAME)
            .await
            .replace_one(doc_id(match_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: STATE_COLLECTION_NAME,
                match_id: match_id.to_owned(),
                source,
            })?;

        Ok(())
    }

    async fn set_metadata(&self, match_id: &str, metadata: MatchMetadata) -> MongoResult<()> {
        let document = MongoMetadataDocument::from_metadata(match_id, metadata);
        self.collection::<MongoMetadataDocument>(METADATA_COLLECTION_NAME)
            .await
            .replace_one(doc_id(match_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection: METADATA_COLLECTION_NAME,
                match_id: match_id.to_owned(),
                source,
            })?;

        Ok(())
    }
}

fn decode_document<T>(
    collection: &'static str,
    match_id: &str,
    document: Document,
) -> MongoResult<T>
where
    T: DeserializeOwned,
{
    bson::deserialize_from_document::<T>(document).map_err(|err| MongoDaoError::Decode {
        collection,
        match_id: match_id.to_owned(),
        detail: err.to_string(),
    })
}

impl GameStore for MongoGameStore {
    fn fetch(&self, match_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredMatch>>> {
        let store = self.clone();
        let match_id = match_id.to_owned();
        Box::pin(async move { store.fetch(&match_id).await.map_err(Into::into) })
    }

    fn set_state(&self, match_id: &str, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let match_id = match_id.to_owned();
        Box::pin(async move { store.set_state(&match_id, state).await.map_err(Into::into) })
    }

    fn set_metadata(
        &self,
        match_id: &str,
        metadata: MatchMetadata,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let match_id = match_id.to_owned();
        Box::pin(async move {
            store
                .set_metadata(&match_id, metadata)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
