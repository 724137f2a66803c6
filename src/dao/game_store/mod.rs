/// MongoDB-backed [`GameStore`].
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{MatchMetadata, MatchState, StoredMatch};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Authoritative store of match state and metadata.
///
/// `set_state` and `set_metadata` are independent writes; callers must not
/// assume atomicity across them.
pub trait GameStore: Send + Sync {
    fn fetch(&self, match_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredMatch>>>;
    fn set_state(&self, match_id: &str, state: MatchState) -> BoxFuture<'static, StorageResult<()>>;
    fn set_metadata(
        &self,
        match_id: &str,
        metadata: MatchMetadata,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
