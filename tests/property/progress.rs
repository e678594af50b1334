use std::time::Duration;

use proptest::prelude::*;

use macroguard::engine::{estimate_remaining, progress_percent};
use macroguard::safety::{ExecutionLimits, check_execution_limits};

proptest! {
    #[test]
    fn percent_stays_within_bounds(index in 0u64..1_000_000, total in 0u64..1_000_000) {
        if let Some(percent) = progress_percent(index, Some(total)) {
            prop_assert!((0.0..=100.0).contains(&percent));
        }
    }

    #[test]
    fn no_estimate_before_the_first_operation(
        total in proptest::option::of(0u64..10_000),
        elapsed_ms in 0u64..100_000,
    ) {
        prop_assert_eq!(
            estimate_remaining(0, total, Duration::from_millis(elapsed_ms)),
            None
        );
    }

    #[test]
    fn estimate_shrinks_as_work_completes(
        total in 2u64..1_000,
        done in 1u64..1_000,
        per_op_ms in 1u64..100,
    ) {
        let done = done.min(total - 1);
        let now = estimate_remaining(
            done,
            Some(total),
            Duration::from_millis(per_op_ms * done),
        );
        let later = estimate_remaining(
            done + 1,
            Some(total),
            Duration::from_millis(per_op_ms * (done + 1)),
        );
        prop_assert!(later.unwrap() <= now.unwrap() + Duration::from_micros(1));
    }

    #[test]
    fn exceeding_a_limit_is_permanent(
        limit in 1u64..500,
        index in 0u64..1_000,
        extra in 0u64..1_000,
    ) {
        let limits = ExecutionLimits { max_operations: Some(limit), max_duration: None };
        if check_execution_limits(index, Duration::ZERO, &limits).is_some() {
            prop_assert!(
                check_execution_limits(index + extra, Duration::ZERO, &limits).is_some()
            );
        }
    }

    #[test]
    fn duration_cap_trips_only_past_the_limit(limit_ms in 1u64..10_000, elapsed_ms in 0u64..20_000) {
        let limits = ExecutionLimits {
            max_operations: None,
            max_duration: Some(Duration::from_millis(limit_ms)),
        };
        let violated =
            check_execution_limits(0, Duration::from_millis(elapsed_ms), &limits).is_some();
        prop_assert_eq!(violated, elapsed_ms > limit_ms);
    }
}
