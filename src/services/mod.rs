/// Health check service.
pub mod health_service;
/// Per-match mutual exclusion.
pub mod match_locks;
/// Game-end notification hook.
pub mod notifier;
/// Player last-seen tracking.
pub mod presence;
/// Single-match reconciliation: planning and execution.
pub mod reconciler;
/// One sweep over every non-terminal match.
pub mod scheduler;
/// Game store connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Timer loop driving scheduled sweeps.
pub mod sweep_driver;
/// Operator-triggered sweeps and reconciliations.
pub mod sweep_service;
/// Time-based termination policy.
pub mod termination;
