//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::{MemorySnapshot, ProbeError};

#[derive(Default)]
struct MemFields {
    total: Option<u64>,
    available: Option<u64>,
    free: Option<u64>,
    buffers: Option<u64>,
    cached: Option<u64>,
}

fn parse_kib(path: &str, line: &str, value: &str) -> Result<u64, ProbeError> {
    let kib = value.parse::<u64>().map_err(|_| ProbeError::Parse {
        path: path.to_string(),
        detail: format!("bad counter in line '{line}'"),
    })?;
    Ok(kib.saturating_mul(1024))
}

/// Parses `/proc/meminfo`. Kernels without `MemAvailable` fall back to
/// `MemFree + Buffers + Cached`.
pub fn parse_meminfo(path: &str, content: &str) -> Result<MemorySnapshot, ProbeError> {
    let mut fields = MemFields::default();
    for line in content.lines() {
        let mut parts = line.split_ascii_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let slot = match key {
            "MemTotal:" => &mut fields.total,
            "MemAvailable:" => &mut fields.available,
            "MemFree:" => &mut fields.free,
            "Buffers:" => &mut fields.buffers,
            "Cached:" => &mut fields.cached,
            _ => continue,
        };
        *slot = Some(parse_kib(path, line, value)?);
    }
    let total = fields.total.ok_or_else(|| ProbeError::MissingField {
        path: path.to_string(),
        field: "MemTotal",
    })?;
    let available = match fields.available {
        Some(available) => available,
        None => {
            let free = fields.free.ok_or_else(|| ProbeError::MissingField {
                path: path.to_string(),
                field: "MemAvailable",
            })?;
            log::debug!("Probe: MemAvailable missing, estimating from MemFree/Buffers/Cached.");
            free.saturating_add(fields.buffers.unwrap_or(0))
                .saturating_add(fields.cached.unwrap_or(0))
                .min(total)
        }
    };
    MemorySnapshot::new(total, available)
}
