//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::sizing_math::SizingPolicy;
use crate::config::defaults::*;
use crate::daemon::types::{ConfigError, DeviceSettings};
use crate::utils::strings;

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Int(u64),
    Text(String),
}

/// A memory amount given either in bytes or as a share of total RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSize")]
pub enum Threshold {
    Bytes(u64),
    Percent(u8),
}

impl Threshold {
    pub fn resolve(self, total_bytes: u64) -> u64 {
        match self {
            Threshold::Bytes(bytes) => bytes,
            Threshold::Percent(pct) => {
                (u128::from(total_bytes) * u128::from(pct) / 100) as u64
            }
        }
    }
}

impl TryFrom<RawSize> for Threshold {
    type Error = String;
    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Int(bytes) => Ok(Threshold::Bytes(bytes)),
            RawSize::Text(text) => match strings::parse_percent(&text) {
                Some(pct) => pct.map(Threshold::Percent),
                None => strings::parse_size(&text).map(Threshold::Bytes),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSize")]
pub struct ByteSize(pub u64);

impl TryFrom<RawSize> for ByteSize {
    type Error = String;
    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Int(bytes) => Ok(ByteSize(bytes)),
            RawSize::Text(text) => strings::parse_size(&text).map(ByteSize),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorConfig {
    pub device_count: u32,
    pub compression_algorithm: String,
    pub small_ratio: u8,
    pub medium_ratio: u8,
    pub large_ratio: u8,
    pub swap_priority: i32,
    pub dynamic_scaling: bool,
    pub low_pressure_threshold: Threshold,
    pub safe_pressure_threshold: Threshold,
    pub scaling_check_interval_secs: u64,
    pub minimum_capacity: ByteSize,
    pub backing_device: Option<String>,
    pub lock_path: PathBuf,
    pub log_level: Option<String>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            device_count: DEVICE_COUNT,
            compression_algorithm: COMPRESSION_ALGORITHM.to_string(),
            small_ratio: SMALL_RATIO_PCT,
            medium_ratio: MEDIUM_RATIO_PCT,
            large_ratio: LARGE_RATIO_PCT,
            swap_priority: SWAP_PRIORITY,
            dynamic_scaling: DYNAMIC_SCALING,
            low_pressure_threshold: Threshold::Bytes(LOW_PRESSURE_THRESHOLD_BYTES),
            safe_pressure_threshold: Threshold::Bytes(SAFE_PRESSURE_THRESHOLD_BYTES),
            scaling_check_interval_secs: SCALING_CHECK_INTERVAL_SEC,
            minimum_capacity: ByteSize(MINIMUM_CAPACITY_BYTES),
            backing_device: None,
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            log_level: None,
        }
    }
}

impl GovernorConfig {
    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content, &path.display().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "Config: {} not found, using built-in defaults.",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_count == 0 || self.device_count > MAX_DEVICE_COUNT {
            return Err(ConfigError::Invalid {
                key: "device_count",
                reason: format!("{} is outside 1..={MAX_DEVICE_COUNT}", self.device_count),
            });
        }
        if !SUPPORTED_ALGORITHMS.contains(&self.compression_algorithm.as_str()) {
            return Err(ConfigError::Invalid {
                key: "compression_algorithm",
                reason: format!(
                    "'{}' is not one of {}",
                    self.compression_algorithm,
                    SUPPORTED_ALGORITHMS.join(", ")
                ),
            });
        }
        if !(MIN_SWAP_PRIORITY..=MAX_SWAP_PRIORITY).contains(&self.swap_priority) {
            return Err(ConfigError::Invalid {
                key: "swap_priority",
                reason: format!(
                    "{} is outside {MIN_SWAP_PRIORITY}..={MAX_SWAP_PRIORITY}",
                    self.swap_priority
                ),
            });
        }
        if self.scaling_check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "scaling_check_interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        if let Some(dev) = &self.backing_device
            && (!dev.starts_with("/dev/") || !strings::validate_value(dev))
        {
            return Err(ConfigError::Invalid {
                key: "backing_device",
                reason: format!("'{dev}' is not a /dev block device path"),
            });
        }
        // Ratio and floor checks do not depend on RAM size.
        self.sizing_policy_unchecked(u64::MAX).validate().or_else(|e| match e {
            ConfigError::Invalid {
                key: "low_pressure_threshold",
                ..
            } => Ok(()),
            other => Err(other),
        })
    }

    /// Resolves percentage thresholds against `total_bytes` and validates the result.
    /// Also rejects a per-device floor that alone would exceed RAM.
    pub fn sizing_policy(&self, total_bytes: u64) -> Result<SizingPolicy, ConfigError> {
        let policy = self.sizing_policy_unchecked(total_bytes);
        policy.validate()?;
        let floor_total = u64::from(self.device_count).saturating_mul(self.minimum_capacity.0);
        if floor_total > total_bytes {
            return Err(ConfigError::Invalid {
                key: "minimum_capacity",
                reason: format!(
                    "{} device(s) of at least {} bytes need {floor_total} bytes, RAM is {total_bytes}",
                    self.device_count, self.minimum_capacity.0
                ),
            });
        }
        Ok(policy)
    }

    fn sizing_policy_unchecked(&self, total_bytes: u64) -> SizingPolicy {
        SizingPolicy {
            small_ratio: self.small_ratio,
            medium_ratio: self.medium_ratio,
            large_ratio: self.large_ratio,
            low_pressure_threshold_bytes: self.low_pressure_threshold.resolve(total_bytes),
            safe_pressure_threshold_bytes: self.safe_pressure_threshold.resolve(total_bytes),
            dynamic_scaling_enabled: self.dynamic_scaling,
            minimum_capacity_bytes: self.minimum_capacity.0,
        }
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            device_count: self.device_count,
            compression_algorithm: self.compression_algorithm.clone(),
            priority: self.swap_priority,
            minimum_capacity_bytes: self.minimum_capacity.0,
            backing_device: self.backing_device.clone(),
        }
    }

    pub fn scaling_interval(&self) -> Duration {
        Duration::from_secs(self.scaling_check_interval_secs)
    }
}
