// src/engine/stats.rs

use std::time::{Duration, SystemTime};

use crate::engine::script::ScriptId;
use crate::engine::state::ExecutionState;

/// Snapshot of a script's current run; all zero / `Idle` when nothing runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatistics {
    pub script: ScriptId,
    pub state: ExecutionState,
    pub operation_index: u64,
    pub elapsed: Duration,
    pub started_at: Option<SystemTime>,
    pub expected_total: Option<u64>,
    pub percent: Option<f64>,
    pub operations_per_second: f64,
}

impl ExecutionStatistics {
    pub fn idle(script: ScriptId) -> Self {
        Self {
            script,
            state: ExecutionState::Idle,
            operation_index: 0,
            elapsed: Duration::ZERO,
            started_at: None,
            expected_total: None,
            percent: None,
            operations_per_second: 0.0,
        }
    }
}

/// Completion percentage against a best-effort total, capped at 100.
pub fn progress_percent(operation_index: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => {
            Some((operation_index as f64 / total as f64 * 100.0).min(100.0))
        }
        _ => None,
    }
}

/// Remaining time assuming the average pace so far continues.
pub fn estimate_remaining(
    operation_index: u64,
    total: Option<u64>,
    elapsed: Duration,
) -> Option<Duration> {
    let total = total?;
    if operation_index == 0 {
        return None;
    }
    let remaining_ops = total.saturating_sub(operation_index);
    let per_op = elapsed.div_f64(operation_index as f64);
    Some(per_op.mul_f64(remaining_ops as f64))
}

pub(crate) fn operations_per_second(operation_index: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        0.0
    } else {
        operation_index as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_needs_a_known_total() {
        assert_eq!(progress_percent(3, None), None);
        assert_eq!(progress_percent(3, Some(0)), None);
        assert_eq!(progress_percent(5, Some(10)), Some(50.0));
        assert_eq!(progress_percent(12, Some(10)), Some(100.0));
    }

    #[test]
    fn remaining_time_uses_average_pace() {
        let est = estimate_remaining(4, Some(10), Duration::from_secs(2)).unwrap();
        assert_eq!(est, Duration::from_secs(3));
        assert_eq!(estimate_remaining(0, Some(10), Duration::from_secs(2)), None);
        assert_eq!(
            estimate_remaining(12, Some(10), Duration::from_secs(2)),
            Some(Duration::ZERO)
        );
    }
}
