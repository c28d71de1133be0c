//! Author: [Seclususs](https://github.com/seclususs)
//!
//! In-memory zram kernel used by the integration tests.

#![allow(dead_code)]

use zram_governor::daemon::status::StatusEvent;
use zram_governor::{
    ApplyStep, DeviceControl, MemorySnapshot, ProbeError, StatusSink, StopSignal, SysError,
    SystemProbe,
};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeDevice {
    pub capacity: u64,
    pub algorithm: String,
    pub formatted: bool,
    pub swap_on: bool,
    pub priority: i32,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub memory: Option<MemorySnapshot>,
    pub devices: BTreeMap<u32, FakeDevice>,
    pub module_loaded: bool,
    pub fail: HashSet<(Option<u32>, ApplyStep)>,
    pub calls: Vec<String>,
}

impl FakeState {
    pub fn mutation_calls(&self) -> usize {
        self.calls.len()
    }
}

/// Cloning shares the state, so a test keeps a handle after moving the
/// system into a controller.
#[derive(Debug, Clone, Default)]
pub struct FakeSystem {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeSystem {
    pub fn with_memory(total_mib: u64, available_mib: u64) -> Self {
        let system = Self::default();
        system.set_memory(total_mib, available_mib);
        system
    }

    pub fn set_memory(&self, total_mib: u64, available_mib: u64) {
        self.state.borrow_mut().memory =
            Some(MemorySnapshot::new(total_mib * MIB, available_mib * MIB).unwrap());
    }

    pub fn break_memory(&self) {
        self.state.borrow_mut().memory = None;
    }

    pub fn fail_at(&self, index: Option<u32>, step: ApplyStep) {
        self.state.borrow_mut().fail.insert((index, step));
    }

    pub fn heal(&self) {
        self.state.borrow_mut().fail.clear();
    }

    /// Pretends the module is already loaded with `count` swapped-on devices.
    pub fn preload(&self, count: u32, capacity: u64) {
        let mut state = self.state.borrow_mut();
        state.module_loaded = true;
        for index in 0..count {
            state.devices.insert(
                index,
                FakeDevice {
                    capacity,
                    algorithm: "lzo".into(),
                    formatted: true,
                    swap_on: true,
                    priority: 5,
                },
            );
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn device(&self, index: u32) -> Option<FakeDevice> {
        self.state.borrow().devices.get(&index).cloned()
    }

    pub fn swapped_on(&self) -> Vec<u32> {
        self.state
            .borrow()
            .devices
            .iter()
            .filter(|(_, d)| d.swap_on)
            .map(|(i, _)| *i)
            .collect()
    }

    fn record(&self, index: Option<u32>, step: ApplyStep) -> Result<(), SysError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(match index {
            Some(index) => format!("{step} {index}"),
            None => step.to_string(),
        });
        if state.fail.contains(&(index, step)) {
            return Err(SysError::CommandFailed(format!("injected {step}")));
        }
        Ok(())
    }

    fn with_device<T>(
        &self,
        index: u32,
        f: impl FnOnce(&mut FakeDevice) -> Result<T, SysError>,
    ) -> Result<T, SysError> {
        let mut state = self.state.borrow_mut();
        match state.devices.get_mut(&index) {
            Some(device) => f(device),
            None => Err(SysError::InvalidPath(format!("zram{index} does not exist"))),
        }
    }
}

impl SystemProbe for FakeSystem {
    fn read_memory(&mut self) -> Result<MemorySnapshot, ProbeError> {
        self.state
            .borrow()
            .memory
            .ok_or_else(|| ProbeError::MissingField {
                path: "/proc/meminfo".into(),
                field: "MemTotal",
            })
    }

    fn read_zram_capacity(&mut self, index: u32) -> Result<Option<u64>, ProbeError> {
        Ok(self.device(index).map(|d| d.capacity))
    }

    fn read_compression_algorithm(&mut self, index: u32) -> Result<Option<String>, ProbeError> {
        Ok(self.device(index).map(|d| d.algorithm))
    }

    fn device_count(&mut self) -> Result<u32, ProbeError> {
        Ok(self.state.borrow().devices.len() as u32)
    }

    fn active_zram_swaps(&mut self) -> Result<Vec<u32>, ProbeError> {
        Ok(self.swapped_on())
    }
}

impl DeviceControl for FakeSystem {
    fn reset_device(&mut self, index: u32) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::ResetDevice)?;
        self.with_device(index, |d| {
            if d.swap_on {
                return Err(SysError::CommandFailed("device busy".into()));
            }
            *d = FakeDevice::default();
            Ok(())
        })
    }

    fn set_backing_device(&mut self, index: u32, _path: &str) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::SetBackingDevice)?;
        self.with_device(index, |_| Ok(()))
    }

    fn set_compression_algorithm(&mut self, index: u32, algorithm: &str) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::SetCompression)?;
        self.with_device(index, |d| {
            d.algorithm = algorithm.to_string();
            Ok(())
        })
    }

    fn set_capacity(&mut self, index: u32, bytes: u64) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::SetCapacity)?;
        self.with_device(index, |d| {
            d.capacity = bytes;
            Ok(())
        })
    }

    fn format_swap(&mut self, index: u32) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::FormatSwap)?;
        self.with_device(index, |d| {
            if d.capacity == 0 {
                return Err(SysError::CommandFailed("no capacity".into()));
            }
            d.formatted = true;
            Ok(())
        })
    }

    fn enable_swap(&mut self, index: u32, priority: i32) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::EnableSwap)?;
        self.with_device(index, |d| {
            if !d.formatted {
                return Err(SysError::CommandFailed("not a swap area".into()));
            }
            d.swap_on = true;
            d.priority = priority;
            Ok(())
        })
    }

    fn disable_swap(&mut self, index: u32) -> Result<(), SysError> {
        self.record(Some(index), ApplyStep::DisableSwap)?;
        self.with_device(index, |d| {
            d.swap_on = false;
            Ok(())
        })
    }

    fn load_module(&mut self, device_count: u32) -> Result<(), SysError> {
        self.record(None, ApplyStep::LoadModule)?;
        let mut state = self.state.borrow_mut();
        if !state.module_loaded {
            state.module_loaded = true;
            state.devices = (0..device_count)
                .map(|index| (index, FakeDevice::default()))
                .collect();
        }
        Ok(())
    }

    fn unload_module(&mut self) -> Result<(), SysError> {
        self.record(None, ApplyStep::UnloadModule)?;
        let mut state = self.state.borrow_mut();
        if state.devices.values().any(|d| d.swap_on) {
            return Err(SysError::CommandFailed("module in use".into()));
        }
        state.module_loaded = false;
        state.devices.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Rc<RefCell<Vec<StatusEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.borrow().clone()
    }

    pub fn last(&self) -> StatusEvent {
        self.events.borrow().last().cloned().expect("no event emitted")
    }
}

impl StatusSink for RecordingSink {
    fn emit(&mut self, event: &StatusEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Lets `waits_before_stop` intervals elapse, calling `on_wait` at each one.
pub struct ScriptedStop<F: FnMut(usize)> {
    pub waits: usize,
    pub waits_before_stop: usize,
    pub on_wait: F,
}

impl<F: FnMut(usize)> ScriptedStop<F> {
    pub fn new(waits_before_stop: usize, on_wait: F) -> Self {
        Self {
            waits: 0,
            waits_before_stop,
            on_wait,
        }
    }
}

impl<F: FnMut(usize)> StopSignal for ScriptedStop<F> {
    fn wait(&mut self, _timeout: Duration) -> bool {
        if self.waits >= self.waits_before_stop {
            return true;
        }
        (self.on_wait)(self.waits);
        self.waits += 1;
        false
    }
}
