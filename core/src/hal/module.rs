//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::SysError;
use crate::hal::helper;

use std::process::Command;

const MODPROBE_BIN: &str = "modprobe";
const ZRAM_MODULE: &str = "zram";

fn run_modprobe(args: &[String]) -> Result<(), SysError> {
    helper::run(Command::new(MODPROBE_BIN).args(args))
}

pub fn load_args(device_count: u32) -> Vec<String> {
    vec![
        ZRAM_MODULE.to_string(),
        format!("num_devices={device_count}"),
    ]
}

pub fn load(device_count: u32) -> Result<(), SysError> {
    log::info!("Module: loading {ZRAM_MODULE} with {device_count} device(s).");
    run_modprobe(&load_args(device_count))
}

pub fn unload() -> Result<(), SysError> {
    log::info!("Module: unloading {ZRAM_MODULE}.");
    run_modprobe(&["-r".to_string(), ZRAM_MODULE.to_string()])
}
