//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::{GovernorError, SysError};

use rustix::fs::{FlockOperation, Mode, OFlags};
use rustix::io::Errno;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

/// Advisory `flock` on a well-known path. Released when dropped.
#[derive(Debug)]
pub struct ProcessLock {
    _fd: OwnedFd,
    path: PathBuf,
}

impl ProcessLock {
    /// Never blocks: a held lock is reported as `LockContention` straight away.
    pub fn acquire(path: &Path) -> Result<Self, GovernorError> {
        let fd = rustix::fs::open(
            path,
            OFlags::CREATE | OFlags::RDWR | OFlags::CLOEXEC,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::ROTH,
        )
        .map_err(SysError::from)?;
        match rustix::fs::flock(&fd, FlockOperation::NonBlockingLockExclusive) {
            Ok(()) => {
                log::debug!("Lock: acquired {}", path.display());
                Ok(Self {
                    _fd: fd,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e == Errno::WOULDBLOCK => {
                Err(GovernorError::LockContention(path.display().to_string()))
            }
            Err(e) => Err(SysError::from(e).into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governor.lock");
        let first = ProcessLock::acquire(&path).unwrap();
        assert_eq!(first.path(), path.as_path());
        let second = ProcessLock::acquire(&path).unwrap_err();
        assert!(matches!(second, GovernorError::LockContention(_)));
        drop(first);
        assert!(ProcessLock::acquire(&path).is_ok());
    }
}
