//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::status::StatusEvent;
use crate::daemon::types::{MemorySnapshot, MmStat, ProbeError, SysError};

use std::time::Duration;

/// Read-only view of memory and zram state. Every call re-reads the kernel.
pub trait SystemProbe {
    fn read_memory(&mut self) -> Result<MemorySnapshot, ProbeError>;
    /// `None` when device `index` does not exist.
    fn read_zram_capacity(&mut self, index: u32) -> Result<Option<u64>, ProbeError>;
    fn read_compression_algorithm(&mut self, index: u32) -> Result<Option<String>, ProbeError>;
    fn device_count(&mut self) -> Result<u32, ProbeError>;
    fn active_zram_swaps(&mut self) -> Result<Vec<u32>, ProbeError>;
    fn read_mm_stat(&mut self, _index: u32) -> Result<Option<MmStat>, ProbeError> {
        Ok(None)
    }
    fn page_size(&self) -> u64 {
        4096
    }
}

/// Mutations of the zram module, its devices and the swap table.
pub trait DeviceControl {
    fn reset_device(&mut self, index: u32) -> Result<(), SysError>;
    fn set_backing_device(&mut self, index: u32, path: &str) -> Result<(), SysError>;
    fn set_compression_algorithm(&mut self, index: u32, algorithm: &str) -> Result<(), SysError>;
    fn set_capacity(&mut self, index: u32, bytes: u64) -> Result<(), SysError>;
    fn format_swap(&mut self, index: u32) -> Result<(), SysError>;
    fn enable_swap(&mut self, index: u32, priority: i32) -> Result<(), SysError>;
    fn disable_swap(&mut self, index: u32) -> Result<(), SysError>;
    fn load_module(&mut self, device_count: u32) -> Result<(), SysError>;
    fn unload_module(&mut self) -> Result<(), SysError>;
}

pub trait ZramSystem: SystemProbe + DeviceControl {}

impl<T: SystemProbe + DeviceControl> ZramSystem for T {}

/// Cooperative cancellation between ticks.
pub trait StopSignal {
    /// Blocks for at most `timeout`; returns `true` once a stop was requested.
    fn wait(&mut self, timeout: Duration) -> bool;
}

pub trait StatusSink {
    fn emit(&mut self, event: &StatusEvent);
}
