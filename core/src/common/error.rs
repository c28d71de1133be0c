//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::ZramDeviceSpec;

use std::fmt;
use std::io;
use thiserror::Error;

/// Failure of an OS primitive (sysfs write, swap syscall, helper binary).
#[derive(Debug, Error)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

impl From<rustix::io::Errno> for SysError {
    fn from(errno: rustix::io::Errno) -> Self {
        SysError::Io(errno.into())
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: SysError,
    },
    #[error("missing field '{field}' in {path}")]
    MissingField { path: String, field: &'static str },
    #[error("malformed value in {path}: {detail}")]
    Parse { path: String, detail: String },
    #[error("inconsistent memory counters: available {available} exceeds total {total}")]
    Inconsistent { total: u64, available: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyStep {
    DisableSwap,
    ResetDevice,
    UnloadModule,
    LoadModule,
    SetBackingDevice,
    SetCompression,
    SetCapacity,
    FormatSwap,
    EnableSwap,
}

impl ApplyStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplyStep::DisableSwap => "disable_swap",
            ApplyStep::ResetDevice => "reset_device",
            ApplyStep::UnloadModule => "unload_module",
            ApplyStep::LoadModule => "load_module",
            ApplyStep::SetBackingDevice => "set_backing_device",
            ApplyStep::SetCompression => "set_compression",
            ApplyStep::SetCapacity => "set_capacity",
            ApplyStep::FormatSwap => "format_swap",
            ApplyStep::EnableSwap => "enable_swap",
        }
    }
}

impl fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed mutation step. `index` is `None` for module-wide steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub index: Option<u32>,
    pub step: ApplyStep,
    pub message: String,
}

impl DeviceFailure {
    pub fn device(index: u32, step: ApplyStep, err: &SysError) -> Self {
        Self {
            index: Some(index),
            step,
            message: err.to_string(),
        }
    }
    pub fn module(step: ApplyStep, err: &SysError) -> Self {
        Self {
            index: None,
            step,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "zram{index}: {} failed: {}", self.step, self.message),
            None => write!(f, "module: {} failed: {}", self.step, self.message),
        }
    }
}

/// Aggregate of every step that failed during one apply, plus the devices
/// that did end up active.
#[derive(Debug, Error)]
#[error("{} step(s) failed, {} device(s) active", .failures.len(), .active.len())]
pub struct ApplyError {
    pub failures: Vec<DeviceFailure>,
    pub active: Vec<ZramDeviceSpec>,
}

impl ApplyError {
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Failure = 1,
    SetupFailed = 2,
    ProbeFailed = 3,
    LockContention = 4,
    InsufficientPrivilege = 5,
    InvalidConfig = 6,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("setup failed: {0}")]
    SetupFailed(ApplyError),
    #[error("teardown failed: {0}")]
    TeardownFailed(ApplyError),
    #[error("another instance holds the lock at {0}")]
    LockContention(String),
    #[error("insufficient privilege: {0}")]
    Privilege(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sys(#[from] SysError),
}

impl GovernorError {
    pub fn kind(&self) -> &'static str {
        match self {
            GovernorError::Probe(_) => "probe",
            GovernorError::SetupFailed(_) => "setup_failed",
            GovernorError::TeardownFailed(_) => "teardown_failed",
            GovernorError::LockContention(_) => "lock_contention",
            GovernorError::Privilege(_) => "privilege",
            GovernorError::Config(_) => "config",
            GovernorError::Sys(_) => "system",
        }
    }
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            GovernorError::Probe(_) => ExitStatus::ProbeFailed,
            GovernorError::SetupFailed(_) => ExitStatus::SetupFailed,
            GovernorError::LockContention(_) => ExitStatus::LockContention,
            GovernorError::Privilege(_) => ExitStatus::InsufficientPrivilege,
            GovernorError::Config(_) => ExitStatus::InvalidConfig,
            GovernorError::TeardownFailed(_) | GovernorError::Sys(_) => ExitStatus::Failure,
        }
    }
    pub fn messages(&self) -> Vec<String> {
        match self {
            GovernorError::SetupFailed(apply) | GovernorError::TeardownFailed(apply) => {
                apply.messages()
            }
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            ExitStatus::Success,
            ExitStatus::Failure,
            ExitStatus::SetupFailed,
            ExitStatus::ProbeFailed,
            ExitStatus::LockContention,
            ExitStatus::InsufficientPrivilege,
            ExitStatus::InvalidConfig,
        ]
        .map(ExitStatus::code);
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn failure_display_names_device_and_step() {
        let err = SysError::InvalidInput("bad".into());
        let failure = DeviceFailure::device(2, ApplyStep::SetCapacity, &err);
        assert_eq!(
            failure.to_string(),
            "zram2: set_capacity failed: invalid input: bad"
        );
        let module = DeviceFailure::module(ApplyStep::LoadModule, &err);
        assert!(module.to_string().starts_with("module: load_module failed"));
    }

    #[test]
    fn teardown_failure_is_not_a_setup_failure() {
        let apply = ApplyError {
            failures: vec![DeviceFailure::device(
                1,
                ApplyStep::DisableSwap,
                &SysError::CommandFailed("busy".into()),
            )],
            active: Vec::new(),
        };
        let err = GovernorError::TeardownFailed(apply);
        assert_eq!(err.exit_status(), ExitStatus::Failure);
        assert_eq!(err.kind(), "teardown_failed");
        assert_eq!(
            err.messages(),
            vec!["zram1: disable_swap failed: command failed: busy".to_string()]
        );
    }
}
