//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::SysError;
use crate::hal::signal;

use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Detaches `command` from the terminal's process group and keeps the stop
/// signals blocked across `exec`, so a shutdown request is only seen by the
/// governor and never kills a helper halfway through a device.
pub fn shield(command: &mut Command) -> &mut Command {
    let mask = signal::stop_mask();
    command.process_group(0);
    unsafe {
        command.pre_exec(move || {
            if libc::sigprocmask(libc::SIG_BLOCK, &mask, std::ptr::null_mut()) == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        });
    }
    command
}

fn describe(command: &Command) -> String {
    let mut line = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Runs a shielded helper binary to completion.
pub fn run(command: &mut Command) -> Result<(), SysError> {
    let output = shield(command).output()?;
    if output.status.success() {
        return Ok(());
    }
    let line = describe(command);
    log::debug!("Helper: {line} exited with {}", output.status);
    Err(SysError::CommandFailed(format!(
        "{line} exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}
