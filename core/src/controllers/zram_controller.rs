//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::sizing_math::{self, ScalingDecision, SizingPolicy};
use crate::config::settings::GovernorConfig;
use crate::controllers::applier;
use crate::daemon::status::{Phase, StatusEvent};
use crate::daemon::traits::{StatusSink, StopSignal, ZramSystem};
use crate::daemon::types::{
    AppliedSpecs, DeviceSettings, GovernorError, ProbeError, ZramDeviceSpec,
};

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    ApplyingInitial,
    StaticIdle,
    Monitoring,
    ApplyingRescale,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Live devices already match the decision; nothing was written.
    Unchanged,
    Rescaled,
    /// Reconfiguration ran but some steps failed; retried next tick.
    PartiallyRescaled,
    /// Probe failed; the tick was skipped.
    Skipped,
}

pub struct ZramController<S, K> {
    system: S,
    sink: K,
    config: GovernorConfig,
    settings: DeviceSettings,
    policy: Option<SizingPolicy>,
    interval: Duration,
    state: ControllerState,
    last_applied: AppliedSpecs,
    last_decision: Option<ScalingDecision>,
}

impl<S: ZramSystem, K: StatusSink> ZramController<S, K> {
    pub fn new(system: S, sink: K, config: &GovernorConfig) -> Self {
        Self {
            system,
            sink,
            settings: config.device_settings(),
            interval: config.scaling_interval(),
            config: config.clone(),
            policy: None,
            state: ControllerState::Uninitialized,
            last_applied: AppliedSpecs::default(),
            last_decision: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn last_applied(&self) -> &AppliedSpecs {
        &self.last_applied
    }

    pub fn last_decision(&self) -> Option<&ScalingDecision> {
        self.last_decision.as_ref()
    }

    /// Initial sizing and device setup. Any error returned is fatal for the run.
    pub fn start(&mut self) -> Result<(), GovernorError> {
        if self.state != ControllerState::Uninitialized {
            log::warn!("Controller: start called in state {:?}, ignoring.", self.state);
            return Ok(());
        }
        self.state = ControllerState::ApplyingInitial;
        log::info!("Controller: Initializing...");
        match self.apply_initial() {
            Ok(()) => {
                self.state = if self.dynamic_scaling() {
                    log::info!(
                        "Controller: dynamic scaling on, checking every {}s.",
                        self.interval.as_secs()
                    );
                    ControllerState::Monitoring
                } else {
                    log::info!("Controller: dynamic scaling off, setup complete.");
                    ControllerState::StaticIdle
                };
                Ok(())
            }
            Err(e) => {
                log::error!("Controller: initial setup failed: {e}");
                self.sink.emit(&StatusEvent {
                    target_ratio: self.last_decision.map(|d| d.target_ratio),
                    target_bytes: self.last_decision.map(|d| d.target_total_bytes),
                    decision_reason: self.last_decision.map(|d| d.reason),
                    ..StatusEvent::fatal(Phase::Initial, &e)
                });
                self.state = ControllerState::Stopped;
                Err(e)
            }
        }
    }

    fn dynamic_scaling(&self) -> bool {
        self.policy.is_some_and(|p| p.dynamic_scaling_enabled)
    }

    fn apply_initial(&mut self) -> Result<(), GovernorError> {
        let memory = self.system.read_memory()?;
        let policy = self.config.sizing_policy(memory.total_bytes)?;
        self.policy = Some(policy);
        let decision = sizing_math::select_effective_ratio(
            memory.total_bytes,
            memory.available_bytes,
            &policy,
        );
        self.last_decision = Some(decision);
        log::info!(
            "Controller: RAM {} bytes, available {} bytes -> {} at {}% ({} bytes).",
            memory.total_bytes,
            memory.available_bytes,
            decision.reason.as_str(),
            decision.target_ratio,
            decision.target_total_bytes
        );
        let desired = sizing_math::plan_devices(&decision, &self.settings);
        let mut event = StatusEvent::new(Phase::Initial, Some(&decision));
        event.mutated = true;
        match applier::apply_decision(
            &mut self.system,
            &desired,
            self.settings.backing_device.as_deref(),
            &self.last_applied,
        ) {
            Ok(applied) => {
                self.last_applied = applied;
            }
            Err(apply_err) if apply_err.active.is_empty() => {
                return Err(GovernorError::SetupFailed(apply_err));
            }
            Err(apply_err) => {
                log::warn!(
                    "Controller: partial setup, {} of {} device(s) active.",
                    apply_err.active.len(),
                    desired.len()
                );
                event.errors = apply_err.messages();
                self.last_applied = AppliedSpecs::new(apply_err.active);
            }
        }
        event.applied_bytes = self.last_applied.total_bytes();
        event.active_devices = self.last_applied.len();
        self.sink.emit(&event);
        Ok(())
    }

    /// One monitoring cycle. Never fatal.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != ControllerState::Monitoring {
            log::debug!("Controller: tick ignored in state {:?}.", self.state);
            return TickOutcome::Skipped;
        }
        let Some(policy) = self.policy else {
            return TickOutcome::Skipped;
        };
        let memory = match self.system.read_memory() {
            Ok(memory) => memory,
            Err(e) => {
                log::warn!("Controller: probe failed, skipping tick: {e}");
                self.emit_skipped(&e);
                return TickOutcome::Skipped;
            }
        };
        let decision = sizing_math::select_effective_ratio(
            memory.total_bytes,
            memory.available_bytes,
            &policy,
        );
        let desired = sizing_math::plan_devices(&decision, &self.settings);
        let converged = match self.is_converged(&desired) {
            Ok(converged) => converged,
            Err(e) => {
                log::warn!("Controller: device probe failed, skipping tick: {e}");
                self.emit_skipped(&e);
                return TickOutcome::Skipped;
            }
        };
        if self.last_decision.is_some_and(|prev| prev.reason != decision.reason) {
            log::info!(
                "Controller: {} -> {} at {}%.",
                self.last_decision.map_or("NONE", |d| d.reason.as_str()),
                decision.reason.as_str(),
                decision.target_ratio
            );
        }
        self.last_decision = Some(decision);
        let mut event = StatusEvent::new(Phase::Rescale, Some(&decision));
        let outcome = if converged {
            log::debug!(
                "Controller: {} bytes already applied, nothing to do.",
                decision.target_total_bytes
            );
            TickOutcome::Unchanged
        } else {
            self.state = ControllerState::ApplyingRescale;
            event.mutated = true;
            log::info!(
                "Controller: rescaling {} -> {} bytes.",
                self.last_applied.total_bytes(),
                decision.target_total_bytes
            );
            let outcome = match applier::apply_decision(
                &mut self.system,
                &desired,
                self.settings.backing_device.as_deref(),
                &self.last_applied,
            ) {
                Ok(applied) => {
                    self.last_applied = applied;
                    TickOutcome::Rescaled
                }
                Err(apply_err) => {
                    log::warn!("Controller: rescale incomplete: {apply_err}");
                    event.errors = apply_err.messages();
                    self.last_applied = AppliedSpecs::new(apply_err.active);
                    TickOutcome::PartiallyRescaled
                }
            };
            self.state = ControllerState::Monitoring;
            outcome
        };
        event.applied_bytes = self.last_applied.total_bytes();
        event.active_devices = self.last_applied.len();
        self.sink.emit(&event);
        outcome
    }

    /// Compares the desired devices against both the last applied set and
    /// the live kernel state, so external changes are noticed.
    fn is_converged(&mut self, desired: &[ZramDeviceSpec]) -> Result<bool, ProbeError> {
        if self.last_applied.devices.as_slice() != desired {
            return Ok(false);
        }
        let count = self.system.device_count()?;
        if usize::try_from(count).ok() != Some(desired.len()) {
            log::info!(
                "Controller: {count} live device(s), expected {}.",
                desired.len()
            );
            return Ok(false);
        }
        let active = self.system.active_zram_swaps()?;
        let page_size = self.system.page_size();
        for spec in desired {
            let live = self.system.read_zram_capacity(spec.index)?.unwrap_or(0);
            if !sizing_math::capacity_matches(live, spec.capacity_bytes, page_size) {
                log::info!(
                    "Controller: zram{} holds {live} bytes, expected {}.",
                    spec.index,
                    spec.capacity_bytes
                );
                return Ok(false);
            }
            if let Some(live) = self.system.read_compression_algorithm(spec.index)?
                && live != spec.compression_algorithm
            {
                log::info!(
                    "Controller: zram{} compresses with {live}, expected {}.",
                    spec.index,
                    spec.compression_algorithm
                );
                return Ok(false);
            }
            if !active.contains(&spec.index) {
                log::info!("Controller: zram{} is no longer swapped on.", spec.index);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn emit_skipped(&mut self, err: &ProbeError) {
        let mut event = StatusEvent::new(Phase::Rescale, None);
        event.applied_bytes = self.last_applied.total_bytes();
        event.active_devices = self.last_applied.len();
        event.errors.push(err.to_string());
        self.sink.emit(&event);
    }

    /// Runs setup, then ticks until `stop` fires. With scaling off the call
    /// returns after setup unless `stay_resident` is set.
    pub fn run(
        &mut self,
        stop: &mut dyn StopSignal,
        stay_resident: bool,
    ) -> Result<(), GovernorError> {
        self.start()?;
        match self.state {
            ControllerState::StaticIdle if stay_resident => {
                while !stop.wait(self.interval) {}
            }
            ControllerState::StaticIdle => return Ok(()),
            _ => {
                while !stop.wait(self.interval) {
                    self.tick();
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Devices are left configured; only the loop stops.
    pub fn shutdown(&mut self) {
        if self.state == ControllerState::Stopped {
            return;
        }
        self.state = ControllerState::Stopping;
        log::info!(
            "Controller: stopping, leaving {} device(s) active.",
            self.last_applied.len()
        );
        let mut event = StatusEvent::new(Phase::Shutdown, self.last_decision.as_ref());
        event.applied_bytes = self.last_applied.total_bytes();
        event.active_devices = self.last_applied.len();
        self.sink.emit(&event);
        self.state = ControllerState::Stopped;
    }
}
