//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::sizing_math::MIB;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/zram-governor.toml";
pub const DEFAULT_LOCK_PATH: &str = "/run/zram-governor.lock";

pub const DEVICE_COUNT: u32 = 1;
pub const MAX_DEVICE_COUNT: u32 = 32;
pub const COMPRESSION_ALGORITHM: &str = "lz4";
pub const SUPPORTED_ALGORITHMS: [&str; 7] =
    ["lzo", "lzo-rle", "lz4", "lz4hc", "zstd", "842", "deflate"];

pub const SMALL_RATIO_PCT: u8 = 60;
pub const MEDIUM_RATIO_PCT: u8 = 50;
pub const LARGE_RATIO_PCT: u8 = 40;

pub const SWAP_PRIORITY: i32 = 100;
pub const MIN_SWAP_PRIORITY: i32 = -1;
pub const MAX_SWAP_PRIORITY: i32 = 32767;

pub const DYNAMIC_SCALING: bool = false;
pub const LOW_PRESSURE_THRESHOLD_BYTES: u64 = 200 * MIB;
pub const SAFE_PRESSURE_THRESHOLD_BYTES: u64 = 400 * MIB;
pub const SCALING_CHECK_INTERVAL_SEC: u64 = 15;
pub const MINIMUM_CAPACITY_BYTES: u64 = 32 * MIB;
