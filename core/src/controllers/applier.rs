//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::traits::ZramSystem;
use crate::daemon::types::{
    AppliedSpecs, ApplyError, ApplyStep, DeviceFailure, SysError, ZramDeviceSpec,
};

use std::collections::BTreeSet;

/// Converges the kernel's zram devices onto `desired`.
///
/// Swap is turned off on every active zram device first. The module is
/// reloaded only when the device count has to change; otherwise existing
/// devices are reset and reused. A failing step abandons only its own
/// device, and every failure is collected into the returned `ApplyError`.
pub fn apply_decision<S: ZramSystem + ?Sized>(
    system: &mut S,
    desired: &[ZramDeviceSpec],
    backing_device: Option<&str>,
    current: &AppliedSpecs,
) -> Result<AppliedSpecs, ApplyError> {
    let mut failures = Vec::new();
    let active_swaps = match system.active_zram_swaps() {
        Ok(indices) => indices,
        Err(e) => {
            log::warn!("Applier: cannot read swap table ({e}), using last applied set.");
            current.indices()
        }
    };
    let mut stuck = BTreeSet::new();
    for index in active_swaps {
        if let Err(e) = system.disable_swap(index) {
            log::warn!("Applier: swapoff zram{index} failed: {e}");
            failures.push(DeviceFailure::device(index, ApplyStep::DisableSwap, &e));
            stuck.insert(index);
        }
    }
    let desired_count = u32::try_from(desired.len()).unwrap_or(u32::MAX);
    let live_count = system.device_count().unwrap_or_else(|e| {
        log::warn!("Applier: cannot count devices ({e}), forcing module reload.");
        u32::MAX
    });
    let mut fresh = false;
    if live_count != desired_count {
        if live_count > 0 {
            if let Err(e) = system.unload_module() {
                log::error!("Applier: module unload failed: {e}");
                failures.push(DeviceFailure::module(ApplyStep::UnloadModule, &e));
                return Err(ApplyError {
                    failures,
                    active: Vec::new(),
                });
            }
        }
        if let Err(e) = system.load_module(desired_count) {
            log::error!("Applier: module load failed: {e}");
            failures.push(DeviceFailure::module(ApplyStep::LoadModule, &e));
            return Err(ApplyError {
                failures,
                active: Vec::new(),
            });
        }
        fresh = true;
    }
    let mut active = Vec::with_capacity(desired.len());
    for spec in desired {
        if stuck.contains(&spec.index) {
            continue;
        }
        match configure_device(system, spec, fresh, backing_device) {
            Ok(()) => {
                log::info!(
                    "Applier: zram{} active, {} bytes, {}, priority {}.",
                    spec.index,
                    spec.capacity_bytes,
                    spec.compression_algorithm,
                    spec.priority
                );
                active.push(spec.clone());
            }
            Err((step, e)) => {
                log::warn!("Applier: zram{} {step} failed: {e}", spec.index);
                failures.push(DeviceFailure::device(spec.index, step, &e));
            }
        }
    }
    if failures.is_empty() {
        Ok(AppliedSpecs::new(active))
    } else {
        Err(ApplyError { failures, active })
    }
}

fn configure_device<S: ZramSystem + ?Sized>(
    system: &mut S,
    spec: &ZramDeviceSpec,
    fresh: bool,
    backing_device: Option<&str>,
) -> Result<(), (ApplyStep, SysError)> {
    let index = spec.index;
    if !fresh {
        system
            .reset_device(index)
            .map_err(|e| (ApplyStep::ResetDevice, e))?;
    }
    if let Some(backing) = backing_device {
        system
            .set_backing_device(index, backing)
            .map_err(|e| (ApplyStep::SetBackingDevice, e))?;
    }
    system
        .set_compression_algorithm(index, &spec.compression_algorithm)
        .map_err(|e| (ApplyStep::SetCompression, e))?;
    system
        .set_capacity(index, spec.capacity_bytes)
        .map_err(|e| (ApplyStep::SetCapacity, e))?;
    system
        .format_swap(index)
        .map_err(|e| (ApplyStep::FormatSwap, e))?;
    system
        .enable_swap(index, spec.priority)
        .map_err(|e| (ApplyStep::EnableSwap, e))?;
    Ok(())
}

/// Turns swap off on every zram device and unloads the module.
/// Returns how many devices were swapped off.
pub fn teardown<S: ZramSystem + ?Sized>(system: &mut S) -> Result<usize, ApplyError> {
    let mut failures = Vec::new();
    let active_swaps = system.active_zram_swaps().unwrap_or_else(|e| {
        log::warn!("Applier: cannot read swap table ({e}), assuming none active.");
        Vec::new()
    });
    let mut released = 0;
    for index in active_swaps {
        match system.disable_swap(index) {
            Ok(()) => released += 1,
            Err(e) => failures.push(DeviceFailure::device(index, ApplyStep::DisableSwap, &e)),
        }
    }
    if failures.is_empty() && system.device_count().unwrap_or(0) > 0 {
        if let Err(e) = system.unload_module() {
            failures.push(DeviceFailure::module(ApplyStep::UnloadModule, &e));
        }
    }
    if failures.is_empty() {
        log::info!("Applier: teardown complete, {released} device(s) released.");
        Ok(released)
    } else {
        Err(ApplyError {
            failures,
            active: Vec::new(),
        })
    }
}
