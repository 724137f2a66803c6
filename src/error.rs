//! Error taxonomy for reconciliation, sweeps, and the HTTP surface.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::dao::{models::MatchId, storage::StorageError};

/// Store a failed write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// The Mirror's current-turn player column.
    MirrorTurnPlayer,
    /// The GameStore's state record.
    GameState,
    /// The GameStore's metadata record.
    GameMetadata,
}

impl std::fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteTarget::MirrorTurnPlayer => f.write_str("mirror current-turn player"),
            WriteTarget::GameState => f.write_str("game state"),
            WriteTarget::GameMetadata => f.write_str("game metadata"),
        }
    }
}

/// Failure of a single match reconciliation. Never fatal to a sweep.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The summary row or the authoritative records are missing.
    #[error("match `{match_id}` not found: {what}")]
    NotFound {
        /// Match being reconciled.
        match_id: MatchId,
        /// Which record was missing.
        what: &'static str,
    },
    /// Reading from the Mirror or the GameStore failed.
    #[error("store unavailable while reading match `{match_id}`")]
    StoreUnavailable {
        /// Match being reconciled.
        match_id: MatchId,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },
    /// The remote current-player lookup failed or answered nothing.
    #[error("current player lookup unavailable for match `{match_id}`")]
    UpstreamUnavailable {
        /// Match being reconciled.
        match_id: MatchId,
        /// Underlying failure; `None` when the lookup answered nothing.
        #[source]
        source: Option<StorageError>,
    },
    /// A persist call failed after a decision was made.
    #[error("failed to write {target} for match `{match_id}`")]
    WriteFailed {
        /// Match being reconciled.
        match_id: MatchId,
        /// Record the write was aimed at.
        target: WriteTarget,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },
}

/// Failure of a whole sweep invocation.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Listing candidate matches failed; nothing was reconciled.
    #[error("failed to list active matches")]
    Fatal(#[source] StorageError),
    /// No game store is installed yet.
    #[error("game store unavailable (degraded mode)")]
    Degraded,
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A sweep could not list its candidates.
    #[error("sweep failed: {0}")]
    Sweep(#[source] SweepError),
    /// Reconciling a single match failed.
    #[error("reconciliation failed: {0}")]
    Reconcile(#[source] ReconcileError),
}

impl From<SweepError> for ServiceError {
    fn from(err: SweepError) -> Self {
        match err {
            SweepError::Degraded => ServiceError::Degraded,
            other => ServiceError::Sweep(other),
        }
    }
}

impl From<ReconcileError> for ServiceError {
    fn from(err: ReconcileError) -> Self {
        ServiceError::Reconcile(err)
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Sweep(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Reconcile(source) => match source {
                ReconcileError::NotFound { .. } => AppError::NotFound(source.to_string()),
                ReconcileError::StoreUnavailable { .. }
                | ReconcileError::UpstreamUnavailable { .. } => {
                    AppError::ServiceUnavailable(source.to_string())
                }
                ReconcileError::WriteFailed { .. } => AppError::Internal(source.to_string()),
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
