pub mod meminfo;
pub mod zram_probe;
