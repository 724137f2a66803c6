use serde::Serialize;

/// One player identity with its last connected observation.
#[derive(Debug, Serialize)]
pub struct PresenceEntry {
    /// Player identity as stored in match metadata.
    pub identity: String,
    /// RFC 3339 timestamp of the last observation.
    pub last_seen: String,
}
