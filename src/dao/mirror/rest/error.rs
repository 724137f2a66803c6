//! Error types shared by the REST mirror implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`RestMirrorError`] failures.
pub type RestMirrorResult<T> = Result<T, RestMirrorError>;

/// Failures that can occur while talking to the relational mirror.
#[derive(Debug, Error)]
pub enum RestMirrorError {
    /// Required environment variable is missing.
    #[error("missing mirror environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build mirror HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send mirror request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The mirror returned an unexpected status code.
    #[error("unexpected mirror response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be decoded.
    #[error("failed to decode mirror response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The current-player procedure answered with something other than a slot.
    #[error("current player lookup for match `{match_id}` returned `{value}`")]
    UnexpectedSlot { match_id: String, value: String },
}
