//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::settings::GovernorConfig;
use crate::controllers::applier;
use crate::controllers::zram_controller::ZramController;
use crate::daemon::status::{self, LogSink, Phase, StatusEvent, StatusReport};
use crate::daemon::traits::{StatusSink, ZramSystem};
use crate::daemon::types::{ConfigError, GovernorError};
use crate::hal::linux::LinuxSystem;
use crate::hal::lock::ProcessLock;
use crate::hal::privilege;
use crate::hal::signal::SignalStop;

/// Guards shared by every mutating command: root, then the host-wide lock.
fn acquire_ownership(config: &GovernorConfig) -> Result<ProcessLock, GovernorError> {
    privilege::ensure_root()?;
    ProcessLock::acquire(&config.lock_path)
}

pub fn run_governor(config: &GovernorConfig, stay_resident: bool) -> Result<(), GovernorError> {
    let mut sink = LogSink;
    let prepared = acquire_ownership(config)
        .and_then(|lock| Ok((lock, SignalStop::install()?)));
    let (lock, mut stop) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            sink.emit(&StatusEvent::fatal(Phase::Initial, &e));
            return Err(e);
        }
    };
    log::info!(
        "Runtime: holding {}, starting controller...",
        lock.path().display()
    );
    let mut controller = ZramController::new(LinuxSystem::new(), sink, config);
    let result = controller.run(&mut stop, stay_resident);
    drop(lock);
    result
}

/// Swaps off and unloads every zram device, then reports the outcome.
pub fn release_devices<S, K>(system: &mut S, sink: &mut K) -> Result<usize, GovernorError>
where
    S: ZramSystem + ?Sized,
    K: StatusSink + ?Sized,
{
    match applier::teardown(system) {
        Ok(released) => {
            let mut event = StatusEvent::new(Phase::Shutdown, None);
            event.mutated = released > 0;
            sink.emit(&event);
            Ok(released)
        }
        Err(apply_err) => {
            let err = GovernorError::TeardownFailed(apply_err);
            sink.emit(&StatusEvent::fatal(Phase::Shutdown, &err));
            Err(err)
        }
    }
}

pub fn stop_governor(config: &GovernorConfig) -> Result<usize, GovernorError> {
    let mut sink = LogSink;
    let _lock = match acquire_ownership(config) {
        Ok(lock) => lock,
        Err(e) => {
            sink.emit(&StatusEvent::fatal(Phase::Shutdown, &e));
            return Err(e);
        }
    };
    release_devices(&mut LinuxSystem::new(), &mut sink)
}

/// Wraps a configuration failure and reports it before the process exits.
pub fn config_failure<K: StatusSink + ?Sized>(err: ConfigError, sink: &mut K) -> GovernorError {
    let err = GovernorError::Config(err);
    sink.emit(&StatusEvent::fatal(Phase::Initial, &err));
    err
}

pub fn report_status(config: &GovernorConfig) -> Result<StatusReport, GovernorError> {
    let mut system = LinuxSystem::new();
    status::build_report(&mut system, config)
}
