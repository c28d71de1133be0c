//! Author: [Seclususs](https://github.com/seclususs)

use zram_governor::algorithms::sizing_math::{
    self, DecisionReason, GIB, MIB, SizingPolicy, per_device_capacity, select_effective_ratio,
};
use zram_governor::DeviceSettings;
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn policy(dynamic: bool) -> SizingPolicy {
    SizingPolicy {
        small_ratio: 60,
        medium_ratio: 50,
        large_ratio: 40,
        low_pressure_threshold_bytes: 200 * MIB,
        safe_pressure_threshold_bytes: 400 * MIB,
        dynamic_scaling_enabled: dynamic,
        minimum_capacity_bytes: 32 * MIB,
    }
}

fn arb_memory() -> impl Strategy<Value = (u64, u64)> {
    (64 * MIB..=64 * GIB).prop_flat_map(|total| (Just(total), 0..=total))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn target_stays_within_floor_and_ram((total, available) in arb_memory(), dynamic in any::<bool>()) {
        let p = policy(dynamic);
        let d = select_effective_ratio(total, available, &p);
        prop_assert!(d.target_ratio > 0 && d.target_ratio <= 100);
        prop_assert!(d.target_total_bytes >= p.minimum_capacity_bytes);
        prop_assert!(d.target_total_bytes <= total.max(p.minimum_capacity_bytes));
    }

    #[test]
    fn static_policy_never_escalates((total, available) in arb_memory()) {
        let p = policy(false);
        let d = select_effective_ratio(total, available, &p);
        prop_assert_eq!(d.reason, DecisionReason::TierDefault);
        prop_assert_eq!(d.target_ratio, sizing_math::select_base_ratio(total, &p));
    }

    #[test]
    fn less_available_memory_never_shrinks_the_pool(
        (total, a) in arb_memory(),
        b_frac in 0u64..=100,
    ) {
        let b = a / 100 * b_frac;
        let p = policy(true);
        let high = select_effective_ratio(total, a, &p);
        let low = select_effective_ratio(total, b, &p);
        prop_assert!(low.target_total_bytes >= high.target_total_bytes);
    }

    #[test]
    fn devices_split_evenly(target in 0u64..=64 * GIB, count in 1u32..=8) {
        let settings = DeviceSettings {
            device_count: count,
            compression_algorithm: "zstd".into(),
            priority: 10,
            minimum_capacity_bytes: 32 * MIB,
            backing_device: None,
        };
        let decision = sizing_math::ScalingDecision {
            target_ratio: 50,
            target_total_bytes: target,
            reason: DecisionReason::TierDefault,
        };
        let plan = sizing_math::plan_devices(&decision, &settings);
        prop_assert_eq!(plan.len(), count as usize);
        let each = per_device_capacity(target, count, 32 * MIB);
        for (i, spec) in plan.iter().enumerate() {
            prop_assert_eq!(spec.index, i as u32);
            prop_assert_eq!(spec.capacity_bytes, each);
            prop_assert!(spec.capacity_bytes >= 32 * MIB);
        }
        if target / u64::from(count) >= 32 * MIB {
            prop_assert!(each * u64::from(count) <= target);
        }
    }
}
