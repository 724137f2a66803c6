mod config;
mod connection;
mod error;
mod models;
/// Collection access and the [`crate::dao::game_store::GameStore`] impl.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Decode { .. } => StorageError::malformed(err.to_string(), err),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
