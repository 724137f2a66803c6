/// Authoritative game-state store.
pub mod game_store;
/// Relational projection store.
pub mod mirror;
/// Domain records shared by both stores.
pub mod models;
/// Storage error type shared by every backend.
pub mod storage;
