//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::SysError;
use crate::utils::strings;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Access to the kernel's pseudo filesystems, confined to a fixed set of roots.
#[derive(Debug, Clone)]
pub struct SysTree {
    proc_root: PathBuf,
    sys_root: PathBuf,
    dev_root: PathBuf,
}

impl Default for SysTree {
    fn default() -> Self {
        Self::new("/proc", "/sys", "/dev")
    }
}

impl SysTree {
    pub fn new(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
        }
    }

    pub fn proc_path(&self, rel: &str) -> PathBuf {
        self.proc_root.join(rel)
    }

    pub fn sys_path(&self, rel: &str) -> PathBuf {
        self.sys_root.join(rel)
    }

    pub fn zram_attr(&self, index: u32, attr: &str) -> PathBuf {
        self.sys_root
            .join("block")
            .join(format!("zram{index}"))
            .join(attr)
    }

    pub fn zram_dir(&self, index: u32) -> PathBuf {
        self.sys_root.join("block").join(format!("zram{index}"))
    }

    pub fn dev_node(&self, index: u32) -> PathBuf {
        self.dev_root.join(format!("zram{index}"))
    }

    fn validate_path_secure(&self, path: &Path) -> Result<(), SysError> {
        let canonical_path = fs::canonicalize(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SysError::Io(e)
            } else {
                SysError::InvalidPath(format!(
                    "Path resolution failed for {}: {e}",
                    path.display()
                ))
            }
        })?;
        let allowed = [&self.proc_root, &self.sys_root]
            .into_iter()
            .filter_map(|root| fs::canonicalize(root).ok())
            .any(|root| canonical_path.starts_with(root));
        if allowed {
            Ok(())
        } else {
            Err(SysError::PermissionDenied(format!(
                "Access denied: {}",
                canonical_path.display()
            )))
        }
    }

    pub fn read_attribute(&self, path: &Path) -> Result<String, SysError> {
        self.validate_path_secure(path)?;
        fs::read_to_string(path).map_err(SysError::Io)
    }

    /// Like [`read_attribute`](Self::read_attribute) but maps a missing file to `None`.
    pub fn read_optional(&self, path: &Path) -> Result<Option<String>, SysError> {
        match self.read_attribute(path) {
            Ok(content) => Ok(Some(content)),
            Err(SysError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn write_value(&self, path: &Path, value: &str) -> Result<(), SysError> {
        self.validate_path_secure(path)?;
        if !strings::validate_value(value) {
            return Err(SysError::InvalidInput(format!(
                "Invalid characters in value for {}: '{value}'",
                path.display()
            )));
        }
        let mut buffer = [0u8; 64];
        let val_bytes = value.as_bytes();
        if val_bytes.len() + 1 > buffer.len() {
            return Err(SysError::InvalidInput(
                "Value too long for stack buffer".into(),
            ));
        }
        buffer[..val_bytes.len()].copy_from_slice(val_bytes);
        buffer[val_bytes.len()] = b'\n';
        let final_slice = &buffer[..=val_bytes.len()];
        let fd = rustix::fs::openat(
            rustix::fs::CWD,
            path,
            rustix::fs::OFlags::WRONLY | rustix::fs::OFlags::TRUNC | rustix::fs::OFlags::CLOEXEC,
            rustix::fs::Mode::empty(),
        )
        .map_err(|e| {
            log::debug!("Openat failed for {}: {e}", path.display());
            SysError::from(e)
        })?;
        rustix::io::write(&fd, final_slice).map_err(|e| {
            log::debug!("Write raw failed '{value}' -> {}: {e}", path.display());
            SysError::from(e)
        })?;
        Ok(())
    }

    pub fn write_u64(&self, path: &Path, value: u64) -> Result<(), SysError> {
        let mut buffer = itoa::Buffer::new();
        self.write_value(path, buffer.format(value))
    }

    /// Names of the entries directly below `dir`; empty when it does not exist.
    pub fn list_dir(&self, dir: &Path) -> Result<Vec<String>, SysError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SysError::Io(e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
