//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::GovernorError;

pub fn ensure_root() -> Result<(), GovernorError> {
    let euid = rustix::process::geteuid();
    if euid.is_root() {
        Ok(())
    } else {
        Err(GovernorError::Privilege(format!(
            "running as uid {}, swap and zram changes need root",
            euid.as_raw()
        )))
    }
}
