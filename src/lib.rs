//! Match lifecycle service: periodically reconciles match records held in a
//! relational mirror against the authoritative game store, terminating
//! aborted or timed-out matches and keeping the mirror's current-turn player
//! in step.

pub mod config;
/// Storage traits, domain models, and backend adapters.
pub mod dao;
/// JSON payloads served by the HTTP routes.
pub mod dto;
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Reconciliation, sweeping, and background supervision.
pub mod services;
/// Shared application state.
pub mod state;

#[cfg(test)]
mod testing;
