//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::sizing_math::{self, DecisionReason, ScalingDecision};
use crate::config::settings::GovernorConfig;
use crate::daemon::traits::{StatusSink, SystemProbe};
use crate::daemon::types::{GovernorError, MemorySnapshot};

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

pub const STATUS_TARGET: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    Rescale,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub timestamp: u64,
    pub phase: Phase,
    pub decision_reason: Option<DecisionReason>,
    pub target_ratio: Option<u8>,
    pub target_bytes: Option<u64>,
    pub applied_bytes: u64,
    pub active_devices: usize,
    /// `false` for no-op and skipped ticks.
    pub mutated: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl StatusEvent {
    pub fn new(phase: Phase, decision: Option<&ScalingDecision>) -> Self {
        Self {
            timestamp: unix_now(),
            phase,
            decision_reason: decision.map(|d| d.reason),
            target_ratio: decision.map(|d| d.target_ratio),
            target_bytes: decision.map(|d| d.target_total_bytes),
            applied_bytes: 0,
            active_devices: 0,
            mutated: false,
            errors: Vec::new(),
            error_kind: None,
        }
    }

    pub fn fatal(phase: Phase, err: &GovernorError) -> Self {
        let mut event = Self::new(phase, None);
        event.errors = err.messages();
        event.error_kind = Some(err.kind());
        event
    }
}

/// Writes each event as one JSON line through the logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&mut self, event: &StatusEvent) {
        match serde_json::to_string(event) {
            Ok(line) if event.error_kind.is_some() => {
                log::error!(target: STATUS_TARGET, "{line}");
            }
            Ok(line) if !event.errors.is_empty() => log::warn!(target: STATUS_TARGET, "{line}"),
            Ok(line) => log::info!(target: STATUS_TARGET, "{line}"),
            Err(e) => log::warn!("Status: failed to serialise event: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub index: u32,
    pub capacity_bytes: u64,
    pub compression_algorithm: Option<String>,
    pub swap_active: bool,
    pub orig_data_size: Option<u64>,
    pub compr_data_size: Option<u64>,
    pub compression_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub memory: MemorySnapshot,
    pub decision: ScalingDecision,
    pub devices: Vec<DeviceReport>,
}

/// Read-only snapshot of what the policy wants and what the kernel has.
pub fn build_report<P: SystemProbe + ?Sized>(
    probe: &mut P,
    config: &GovernorConfig,
) -> Result<StatusReport, GovernorError> {
    let memory = probe.read_memory()?;
    let policy = config.sizing_policy(memory.total_bytes)?;
    let decision =
        sizing_math::select_effective_ratio(memory.total_bytes, memory.available_bytes, &policy);
    let active = probe.active_zram_swaps()?;
    let count = probe.device_count()?;
    let mut devices = Vec::new();
    for index in 0..count {
        let Some(capacity_bytes) = probe.read_zram_capacity(index)? else {
            continue;
        };
        let mm_stat = probe.read_mm_stat(index)?;
        devices.push(DeviceReport {
            index,
            capacity_bytes,
            compression_algorithm: probe.read_compression_algorithm(index)?,
            swap_active: active.contains(&index),
            orig_data_size: mm_stat.map(|s| s.orig_data_size),
            compr_data_size: mm_stat.map(|s| s.compr_data_size),
            compression_ratio: mm_stat.and_then(|s| s.compression_ratio()),
        });
    }
    Ok(StatusReport {
        memory,
        decision,
        devices,
    })
}

impl StatusReport {
    pub fn render_text(&self) -> String {
        const MIB: f64 = 1024.0 * 1024.0;
        let mut out = format!(
            "memory: total {:.0} MiB, available {:.0} MiB\npolicy: {} at {}% -> {:.0} MiB\n",
            self.memory.total_bytes as f64 / MIB,
            self.memory.available_bytes as f64 / MIB,
            self.decision.reason.as_str(),
            self.decision.target_ratio,
            self.decision.target_total_bytes as f64 / MIB,
        );
        if self.devices.is_empty() {
            out.push_str("devices: none\n");
        }
        for dev in &self.devices {
            out.push_str(&format!(
                "zram{}: {:.0} MiB, {}, swap {}",
                dev.index,
                dev.capacity_bytes as f64 / MIB,
                dev.compression_algorithm.as_deref().unwrap_or("?"),
                if dev.swap_active { "on" } else { "off" },
            ));
            if let Some(ratio) = dev.compression_ratio {
                out.push_str(&format!(", ratio {ratio:.2}"));
            }
            out.push('\n');
        }
        out
    }
}

