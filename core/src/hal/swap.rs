//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::SysError;
use crate::hal::helper;

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::Command;

// <linux/swap.h>
const SWAP_FLAG_PREFER: libc::c_int = 0x8000;
const SWAP_FLAG_PRIO_MASK: libc::c_int = 0x7fff;

const MKSWAP_BIN: &str = "mkswap";

fn to_cstring(path: &Path) -> Result<CString, SysError> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| SysError::InvalidInput(format!("String contains null byte: {e}")))
}

/// Negative priorities leave the choice to the kernel.
pub fn swap_flags(priority: i32) -> libc::c_int {
    if priority < 0 {
        0
    } else {
        SWAP_FLAG_PREFER | (priority & SWAP_FLAG_PRIO_MASK)
    }
}

pub fn swap_on(device: &Path, priority: i32) -> Result<(), SysError> {
    let c_path = to_cstring(device)?;
    let res = unsafe { libc::swapon(c_path.as_ptr(), swap_flags(priority)) };
    if res < 0 {
        let err = io::Error::last_os_error();
        log::debug!("swapon({}) failed: {err}", device.display());
        return Err(SysError::Io(err));
    }
    Ok(())
}

pub fn swap_off(device: &Path) -> Result<(), SysError> {
    let c_path = to_cstring(device)?;
    let res = unsafe { libc::swapoff(c_path.as_ptr()) };
    if res < 0 {
        let err = io::Error::last_os_error();
        log::debug!("swapoff({}) failed: {err}", device.display());
        return Err(SysError::Io(err));
    }
    Ok(())
}

/// Writes a fresh swap signature through the `mkswap` helper.
pub fn make_swap(device: &Path) -> Result<(), SysError> {
    helper::run(Command::new(MKSWAP_BIN).arg(device))
}
