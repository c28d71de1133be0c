//! Author: [Seclususs](https://github.com/seclususs)

pub use crate::common::error::{
    ApplyError, ApplyStep, ConfigError, DeviceFailure, ExitStatus, GovernorError, ProbeError,
    SysError,
};

use serde::Serialize;

/// Total and available memory taken from a single read of the kernel counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemorySnapshot {
    pub fn new(total_bytes: u64, available_bytes: u64) -> Result<Self, ProbeError> {
        if available_bytes > total_bytes {
            return Err(ProbeError::Inconsistent {
                total: total_bytes,
                available: available_bytes,
            });
        }
        Ok(Self {
            total_bytes,
            available_bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZramDeviceSpec {
    pub index: u32,
    pub capacity_bytes: u64,
    pub compression_algorithm: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedSpecs {
    pub devices: Vec<ZramDeviceSpec>,
}

impl AppliedSpecs {
    pub fn new(devices: Vec<ZramDeviceSpec>) -> Self {
        Self { devices }
    }
    pub fn total_bytes(&self) -> u64 {
        self.devices
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.capacity_bytes))
    }
    pub fn indices(&self) -> Vec<u32> {
        self.devices.iter().map(|d| d.index).collect()
    }
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

/// Per-device values that do not depend on the sizing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub device_count: u32,
    pub compression_algorithm: String,
    pub priority: i32,
    pub minimum_capacity_bytes: u64,
    pub backing_device: Option<String>,
}

/// Compression counters from `mm_stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MmStat {
    pub orig_data_size: u64,
    pub compr_data_size: u64,
    pub mem_used_total: u64,
}

impl MmStat {
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.compr_data_size == 0 {
            None
        } else {
            Some(self.orig_data_size as f64 / self.compr_data_size as f64)
        }
    }
}
