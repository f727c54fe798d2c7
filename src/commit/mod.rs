//! Configuration push with commit-confirmed and health checking.

mod health;
mod transaction;

pub use health::{DEFAULT_HEALTH_CHECK, HealthCheck, HealthStatus, failure_marker};
pub use transaction::{
    CommitState, ConfigPush, DEFAULT_CONFIRM_TIMEOUT_MINUTES, PushOptions, PushOutcome,
};
