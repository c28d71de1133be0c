//! Author: [Seclususs](https://github.com/seclususs)
//!
//! Tiered sizing of the compressed swap pool with a two-step pressure
//! escalation. Everything here is pure.

use crate::daemon::types::{ConfigError, DeviceSettings, ZramDeviceSpec};

use serde::Serialize;

pub const MIB: u64 = 1024 * 1024;
pub const GIB: u64 = 1024 * MIB;

const SMALL_TIER_MAX: u64 = GIB;
const MEDIUM_TIER_MAX: u64 = 2 * GIB;
const ELEVATED_STEP_PCT: u8 = 20;
const FULL_RATIO_PCT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    TierDefault,
    PressureElevated,
    PressureEmergency,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::TierDefault => "TIER_DEFAULT",
            DecisionReason::PressureElevated => "PRESSURE_ELEVATED",
            DecisionReason::PressureEmergency => "PRESSURE_EMERGENCY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingPolicy {
    pub small_ratio: u8,
    pub medium_ratio: u8,
    pub large_ratio: u8,
    pub low_pressure_threshold_bytes: u64,
    pub safe_pressure_threshold_bytes: u64,
    pub dynamic_scaling_enabled: bool,
    pub minimum_capacity_bytes: u64,
}

impl SizingPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, ratio) in [
            ("small_ratio", self.small_ratio),
            ("medium_ratio", self.medium_ratio),
            ("large_ratio", self.large_ratio),
        ] {
            if ratio == 0 || ratio > FULL_RATIO_PCT {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("{ratio} is outside (0, 100]"),
                });
            }
        }
        if self.minimum_capacity_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "minimum_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        if self.low_pressure_threshold_bytes >= self.safe_pressure_threshold_bytes {
            return Err(ConfigError::Invalid {
                key: "low_pressure_threshold",
                reason: format!(
                    "{} bytes must be below the safe threshold of {} bytes",
                    self.low_pressure_threshold_bytes, self.safe_pressure_threshold_bytes
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalingDecision {
    pub target_ratio: u8,
    pub target_total_bytes: u64,
    pub reason: DecisionReason,
}

pub fn select_base_ratio(total_bytes: u64, policy: &SizingPolicy) -> u8 {
    if total_bytes <= SMALL_TIER_MAX {
        policy.small_ratio
    } else if total_bytes <= MEDIUM_TIER_MAX {
        policy.medium_ratio
    } else {
        policy.large_ratio
    }
}

pub fn select_effective_ratio(
    total_bytes: u64,
    available_bytes: u64,
    policy: &SizingPolicy,
) -> ScalingDecision {
    let base = select_base_ratio(total_bytes, policy);
    let (target_ratio, reason) = if !policy.dynamic_scaling_enabled {
        (base, DecisionReason::TierDefault)
    } else if available_bytes < policy.low_pressure_threshold_bytes {
        (FULL_RATIO_PCT, DecisionReason::PressureEmergency)
    } else if available_bytes < policy.safe_pressure_threshold_bytes {
        (
            base.saturating_add(ELEVATED_STEP_PCT).min(FULL_RATIO_PCT),
            DecisionReason::PressureElevated,
        )
    } else {
        (base, DecisionReason::TierDefault)
    };
    ScalingDecision {
        target_ratio,
        target_total_bytes: target_total_bytes(
            total_bytes,
            target_ratio,
            policy.minimum_capacity_bytes,
        ),
        reason,
    }
}

/// `max(total * ratio / 100, minimum)`, rounding down.
pub fn target_total_bytes(total_bytes: u64, ratio: u8, minimum_capacity_bytes: u64) -> u64 {
    let ratio = u128::from(ratio.min(FULL_RATIO_PCT));
    let scaled = (u128::from(total_bytes) * ratio / 100) as u64;
    scaled.max(minimum_capacity_bytes)
}

/// Even split across devices; the remainder is dropped. A device never gets
/// less than the configured floor.
pub fn per_device_capacity(
    target_total_bytes: u64,
    device_count: u32,
    minimum_capacity_bytes: u64,
) -> u64 {
    let count = u64::from(device_count.max(1));
    (target_total_bytes / count).max(minimum_capacity_bytes)
}

pub fn plan_devices(decision: &ScalingDecision, settings: &DeviceSettings) -> Vec<ZramDeviceSpec> {
    let capacity = per_device_capacity(
        decision.target_total_bytes,
        settings.device_count,
        settings.minimum_capacity_bytes,
    );
    (0..settings.device_count)
        .map(|index| ZramDeviceSpec {
            index,
            capacity_bytes: capacity,
            compression_algorithm: settings.compression_algorithm.clone(),
            priority: settings.priority,
        })
        .collect()
}

/// The kernel rounds `disksize` up to a whole page.
pub fn capacity_matches(live_bytes: u64, wanted_bytes: u64, page_size: u64) -> bool {
    if live_bytes == wanted_bytes {
        return true;
    }
    let page = page_size.max(1);
    wanted_bytes.div_ceil(page).saturating_mul(page) == live_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn tier_boundaries_are_inclusive_on_lower_tier() {
        let p = policy(false);
        assert_eq!(select_base_ratio(1024 * MIB, &p), 60);
        assert_eq!(select_base_ratio(1025 * MIB, &p), 50);
        assert_eq!(select_base_ratio(2048 * MIB, &p), 50);
        assert_eq!(select_base_ratio(2049 * MIB, &p), 40);
        assert_eq!(select_base_ratio(0, &p), 60);
    }

    #[test]
    fn static_policy_uses_tier_default() {
        let d = select_effective_ratio(1024 * MIB, 600 * MIB, &policy(false));
        assert_eq!(d.target_ratio, 60);
        assert_eq!(d.reason, DecisionReason::TierDefault);
        assert_eq!(d.target_total_bytes, 1024 * MIB * 60 / 100);
        assert_eq!(d.target_total_bytes / MIB, 614);
    }

    #[test]
    fn static_policy_ignores_pressure() {
        let d = select_effective_ratio(1024 * MIB, 10 * MIB, &policy(false));
        assert_eq!(d.reason, DecisionReason::TierDefault);
        assert_eq!(d.target_ratio, 60);
    }

    #[test]
    fn emergency_pressure_uses_all_ram() {
        let d = select_effective_ratio(1024 * MIB, 150 * MIB, &policy(true));
        assert_eq!(d.target_ratio, 100);
        assert_eq!(d.reason, DecisionReason::PressureEmergency);
        assert_eq!(d.target_total_bytes, 1024 * MIB);
    }

    #[test]
    fn elevated_pressure_adds_fixed_step() {
        let d = select_effective_ratio(1024 * MIB, 350 * MIB, &policy(true));
        assert_eq!(d.target_ratio, 80);
        assert_eq!(d.reason, DecisionReason::PressureElevated);
    }

    #[test]
    fn elevated_step_is_capped() {
        let mut p = policy(true);
        p.small_ratio = 90;
        let d = select_effective_ratio(512 * MIB, 300 * MIB, &p);
        assert_eq!(d.target_ratio, 100);
    }

    #[test]
    fn thresholds_are_strict() {
        let p = policy(true);
        let at_low = select_effective_ratio(1024 * MIB, 200 * MIB, &p);
        assert_eq!(at_low.reason, DecisionReason::PressureElevated);
        let at_safe = select_effective_ratio(1024 * MIB, 400 * MIB, &p);
        assert_eq!(at_safe.reason, DecisionReason::TierDefault);
    }

    #[test]
    fn floor_applies_to_tiny_targets() {
        assert_eq!(target_total_bytes(40 * MIB, 10, 32 * MIB), 32 * MIB);
        assert_eq!(target_total_bytes(u64::MAX, 100, 0), u64::MAX);
    }

    #[test]
    fn split_truncates_remainder() {
        assert_eq!(per_device_capacity(10 * MIB + 2, 3, 1), (10 * MIB + 2) / 3);
        assert_eq!(per_device_capacity(64 * MIB, 4, 32 * MIB), 32 * MIB);
    }

    #[test]
    fn plan_covers_every_index() {
        let settings = DeviceSettings {
            device_count: 3,
            compression_algorithm: "zstd".into(),
            priority: 5,
            minimum_capacity_bytes: MIB,
            backing_device: None,
        };
        let decision = ScalingDecision {
            target_ratio: 50,
            target_total_bytes: 300 * MIB,
            reason: DecisionReason::TierDefault,
        };
        let plan = plan_devices(&decision, &settings);
        assert_eq!(plan.iter().map(|d| d.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(plan.iter().all(|d| d.capacity_bytes == 100 * MIB));
        assert!(plan.iter().all(|d| d.compression_algorithm == "zstd"));
    }

    #[test]
    fn page_rounding_counts_as_match() {
        assert!(capacity_matches(8192, 8192, 4096));
        assert!(capacity_matches(8192, 4097, 4096));
        assert!(!capacity_matches(4096, 4097, 4096));
        assert!(!capacity_matches(0, 4096, 4096));
    }

    #[test]
    fn validate_rejects_bad_policy() {
        let mut p = policy(true);
        assert!(p.validate().is_ok());
        p.medium_ratio = 0;
        assert!(p.validate().is_err());
        p.medium_ratio = 50;
        p.low_pressure_threshold_bytes = p.safe_pressure_threshold_bytes;
        assert!(p.validate().is_err());
    }
}
