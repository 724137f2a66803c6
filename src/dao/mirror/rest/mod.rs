mod config;
mod error;
mod models;
mod store;

pub use config::RestMirrorConfig;
pub use error::RestMirrorError;
pub use store::RestMirror;

use crate::dao::storage::StorageError;

impl From<RestMirrorError> for StorageError {
    fn from(err: RestMirrorError) -> Self {
        match err {
            RestMirrorError::DecodeResponse { .. } | RestMirrorError::UnexpectedSlot { .. } => {
                StorageError::malformed(err.to_string(), err)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
