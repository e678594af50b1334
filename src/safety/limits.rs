// src/safety/limits.rs

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_OPERATIONS: u64 = 10_000;
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(10 * 60);

/// Caps on a single run. `None` disables the corresponding check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_operations: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl ExecutionLimits {
    pub fn unlimited() -> Self {
        Self {
            max_operations: None,
            max_duration: None,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_operations: Some(DEFAULT_MAX_OPERATIONS),
            max_duration: Some(DEFAULT_MAX_DURATION),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("operation limit of {limit} reached (attempted operation #{attempted})")]
    OperationCount { limit: u64, attempted: u64 },

    #[error("duration limit of {limit:?} exceeded after {elapsed:?}")]
    Duration { limit: Duration, elapsed: Duration },
}

/// Check whether performing the next operation would violate `limits`.
///
/// `operation_index` is the number of operations already performed.
pub fn check_execution_limits(
    operation_index: u64,
    elapsed: Duration,
    limits: &ExecutionLimits,
) -> Option<LimitViolation> {
    if let Some(limit) = limits.max_operations {
        let attempted = operation_index.saturating_add(1);
        if attempted > limit {
            return Some(LimitViolation::OperationCount { limit, attempted });
        }
    }

    if let Some(limit) = limits.max_duration {
        if elapsed > limit {
            return Some(LimitViolation::Duration { limit, elapsed });
        }
    }

    None
}
