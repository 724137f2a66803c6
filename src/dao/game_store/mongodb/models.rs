use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{
    MatchMetadata, MatchState, PlayerConnection, TerminationDescriptor, TurnContext,
};

use super::error::MongoDaoError;

pub const STATE_COLLECTION_NAME: &str = "states";
pub const METADATA_COLLECTION_NAME: &str = "metadata";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStateDocument {
    #[serde(rename = "_id")]
    id: String,
    version: i64,
    board: Value,
    ctx: TurnContext,
}

impl MongoStateDocument {
    pub fn from_state(match_id: &str, state: MatchState) -> Result<Self, MongoDaoError> {
        let version = i64::try_from(state.version).map_err(|_| MongoDaoError::Decode {
            collection: STATE_COLLECTION_NAME,
            match_id: match_id.to_owned(),
            detail: format!("version {} does not fit a BSON int64", state.version),
        })?;

        Ok(Self {
            id: match_id.to_owned(),
            version,
            board: state.board,
            ctx: state.ctx,
        })
    }

    pub fn into_state(self) -> Result<MatchState, MongoDaoError> {
        let version = u64::try_from(self.version).map_err(|_| MongoDaoError::Decode {
            collection: STATE_COLLECTION_NAME,
            match_id: self.id.clone(),
            detail: format!("negative version {}", self.version),
        })?;

        Ok(MatchState {
            version,
            board: self.board,
            ctx: self.ctx,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMetadataDocument {
    #[serde(rename = "_id")]
    id: String,
    players: Vec<PlayerConnection>,
    #[serde(default)]
    gameover: Option<TerminationDescriptor>,
    updated_at: DateTime,
}

impl MongoMetadataDocument {
    pub fn from_metadata(match_id: &str, metadata: MatchMetadata) -> Self {
        Self {
            id: match_id.to_owned(),
            players: metadata.players,
            gameover: metadata.gameover,
            updated_at: DateTime::from_system_time(metadata.updated_at),
        }
    }
}

impl From<MongoMetadataDocument> for MatchMetadata {
    fn from(value: MongoMetadataDocument) -> Self {
        Self {
            players: value.players,
            gameover: value.gameover,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn doc_id(match_id: &str) -> Document {
    doc! {"_id": match_id}
}
