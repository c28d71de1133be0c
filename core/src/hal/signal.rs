//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::traits::StopSignal;
use crate::daemon::types::SysError;

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::os::fd::{AsRawFd, FromRawFd};
use std::time::{Duration, Instant};

const STOP_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];
const SIGINFO_SIZE: usize = std::mem::size_of::<libc::signalfd_siginfo>();

/// Termination signals delivered through a `signalfd`, so the inter-tick
/// sleep wakes up as soon as one arrives.
pub struct SignalStop {
    file: File,
    stopped: bool,
}

/// The set of signals that request a stop.
pub fn stop_mask() -> libc::sigset_t {
    unsafe {
        let mut mask: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut mask);
        for sig in STOP_SIGNALS {
            libc::sigaddset(&mut mask, sig);
        }
        mask
    }
}

impl SignalStop {
    /// Blocks the stop signals on the calling thread and opens a `signalfd`
    /// for them. Call before spawning any thread.
    pub fn install() -> Result<Self, SysError> {
        let mask = stop_mask();
        let fd = unsafe {
            let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &mask, std::ptr::null_mut());
            if rc != 0 {
                return Err(SysError::Io(io::Error::from_raw_os_error(rc)));
            }
            libc::signalfd(-1, &mask, libc::SFD_CLOEXEC | libc::SFD_NONBLOCK)
        };
        if fd < 0 {
            return Err(SysError::Io(io::Error::last_os_error()));
        }
        Ok(Self {
            file: unsafe { File::from_raw_fd(fd) },
            stopped: false,
        })
    }

    fn drain(&mut self) -> bool {
        let mut buf = [0u8; SIGINFO_SIZE];
        loop {
            match self.file.read(&mut buf) {
                Ok(n) if n == SIGINFO_SIZE => {
                    let signo = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
                    log::info!("Signal: received signal {signo}, requesting shutdown...");
                    self.stopped = true;
                }
                Ok(_) => return self.stopped,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return self.stopped,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("Signal: read failed: {e}");
                    return self.stopped;
                }
            }
        }
    }
}

impl StopSignal for SignalStop {
    fn wait(&mut self, timeout: Duration) -> bool {
        if self.stopped {
            return true;
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout_ms = i32::try_from(remaining.as_millis()).unwrap_or(i32::MAX);
            let mut pfd = libc::pollfd {
                fd: self.file.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let nfds = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if nfds < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                log::warn!("Signal: poll failed: {err}");
                std::thread::sleep(remaining);
                return self.stopped;
            }
            if nfds > 0 && pfd.revents & libc::POLLIN != 0 {
                return self.drain();
            }
            if remaining.is_zero() || Instant::now() >= deadline {
                return self.stopped;
            }
        }
    }
}
