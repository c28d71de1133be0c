//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::MmStat;

/// `"zram3"` -> `Some(3)`.
pub fn parse_device_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("zram")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Picks the bracketed entry out of `comp_algorithm`, e.g. `"lzo [lz4] zstd"`.
pub fn parse_comp_algorithm(content: &str) -> Option<String> {
    let content = content.trim();
    for token in content.split_ascii_whitespace() {
        if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return Some(inner.to_string());
        }
    }
    // Older kernels print only the active algorithm.
    if !content.is_empty() && !content.contains(' ') {
        return Some(content.to_string());
    }
    None
}

/// Indices of `/dev/zramN` entries listed in `/proc/swaps`.
pub fn parse_active_zram_swaps(content: &str) -> Vec<u32> {
    let mut indices: Vec<u32> = content
        .lines()
        .skip(1)
        .filter_map(|line| line.split_ascii_whitespace().next())
        .filter_map(|dev| dev.strip_prefix("/dev/"))
        .filter_map(parse_device_index)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

pub fn parse_mm_stat(content: &str) -> Option<MmStat> {
    let mut fields = content.split_ascii_whitespace().map(str::parse::<u64>);
    let orig_data_size = fields.next()?.ok()?;
    let compr_data_size = fields.next()?.ok()?;
    let mem_used_total = fields.next()?.ok()?;
    Some(MmStat {
        orig_data_size,
        compr_data_size,
        mem_used_total,
    })
}
