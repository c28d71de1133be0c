//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::traits::{DeviceControl, SystemProbe};
use crate::daemon::types::{MemorySnapshot, MmStat, ProbeError, SysError};
use crate::hal::filesystem::SysTree;
use crate::hal::{module, swap};
use crate::monitors::{meminfo, zram_probe};

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const DEV_NODE_WAIT: Duration = Duration::from_secs(2);
const DEV_NODE_POLL: Duration = Duration::from_millis(50);

/// Capability implementation backed by the running kernel.
#[derive(Debug, Clone, Default)]
pub struct LinuxSystem {
    tree: SysTree,
}

/// udev creates `/dev/zramN` asynchronously after the module loads.
fn wait_for_node(node: &Path) {
    let deadline = Instant::now() + DEV_NODE_WAIT;
    while !node.exists() && Instant::now() < deadline {
        thread::sleep(DEV_NODE_POLL);
    }
}

fn read_error(path: &Path, source: SysError) -> ProbeError {
    ProbeError::Read {
        path: path.display().to_string(),
        source,
    }
}

impl LinuxSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(tree: SysTree) -> Self {
        Self { tree }
    }

    fn read_zram_attr(&self, index: u32, attr: &str) -> Result<Option<String>, ProbeError> {
        if !self.tree.zram_dir(index).is_dir() {
            return Ok(None);
        }
        let path = self.tree.zram_attr(index, attr);
        self.tree
            .read_optional(&path)
            .map_err(|e| read_error(&path, e))
    }

    fn write_zram_attr(&self, index: u32, attr: &str, value: &str) -> Result<(), SysError> {
        self.tree.write_value(&self.tree.zram_attr(index, attr), value)
    }
}

impl SystemProbe for LinuxSystem {
    fn read_memory(&mut self) -> Result<MemorySnapshot, ProbeError> {
        let path = self.tree.proc_path("meminfo");
        let content = self
            .tree
            .read_attribute(&path)
            .map_err(|e| read_error(&path, e))?;
        meminfo::parse_meminfo(&path.display().to_string(), &content)
    }

    fn read_zram_capacity(&mut self, index: u32) -> Result<Option<u64>, ProbeError> {
        let Some(content) = self.read_zram_attr(index, "disksize")? else {
            return Ok(None);
        };
        content
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ProbeError::Parse {
                path: self.tree.zram_attr(index, "disksize").display().to_string(),
                detail: format!("'{}' is not a byte count", content.trim()),
            })
    }

    fn read_compression_algorithm(&mut self, index: u32) -> Result<Option<String>, ProbeError> {
        Ok(self
            .read_zram_attr(index, "comp_algorithm")?
            .and_then(|content| zram_probe::parse_comp_algorithm(&content)))
    }

    fn device_count(&mut self) -> Result<u32, ProbeError> {
        let dir = self.tree.sys_path("block");
        let names = self.tree.list_dir(&dir).map_err(|e| read_error(&dir, e))?;
        let count = names
            .iter()
            .filter(|name| zram_probe::parse_device_index(name).is_some())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn active_zram_swaps(&mut self) -> Result<Vec<u32>, ProbeError> {
        let path = self.tree.proc_path("swaps");
        let content = self
            .tree
            .read_attribute(&path)
            .map_err(|e| read_error(&path, e))?;
        Ok(zram_probe::parse_active_zram_swaps(&content))
    }

    fn read_mm_stat(&mut self, index: u32) -> Result<Option<MmStat>, ProbeError> {
        Ok(self
            .read_zram_attr(index, "mm_stat")?
            .and_then(|content| zram_probe::parse_mm_stat(&content)))
    }

    fn page_size(&self) -> u64 {
        rustix::param::page_size() as u64
    }
}

impl DeviceControl for LinuxSystem {
    fn reset_device(&mut self, index: u32) -> Result<(), SysError> {
        self.write_zram_attr(index, "reset", "1")
    }

    fn set_backing_device(&mut self, index: u32, path: &str) -> Result<(), SysError> {
        self.write_zram_attr(index, "backing_dev", path)
    }

    fn set_compression_algorithm(&mut self, index: u32, algorithm: &str) -> Result<(), SysError> {
        self.write_zram_attr(index, "comp_algorithm", algorithm)
    }

    fn set_capacity(&mut self, index: u32, bytes: u64) -> Result<(), SysError> {
        self.tree
            .write_u64(&self.tree.zram_attr(index, "disksize"), bytes)
    }

    fn format_swap(&mut self, index: u32) -> Result<(), SysError> {
        let node = self.tree.dev_node(index);
        wait_for_node(&node);
        swap::make_swap(&node)
    }

    fn enable_swap(&mut self, index: u32, priority: i32) -> Result<(), SysError> {
        swap::swap_on(&self.tree.dev_node(index), priority)
    }

    fn disable_swap(&mut self, index: u32) -> Result<(), SysError> {
        swap::swap_off(&self.tree.dev_node(index))
    }

    fn load_module(&mut self, device_count: u32) -> Result<(), SysError> {
        module::load(device_count)
    }

    fn unload_module(&mut self) -> Result<(), SysError> {
        module::unload()
    }
}
