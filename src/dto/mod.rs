use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Payloads returned by the admin routes.
pub mod admin;
/// Healthcheck payload.
pub mod health;
/// Presence listing payload.
pub mod presence;

/// Render a timestamp as RFC 3339 for JSON responses.
pub fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
