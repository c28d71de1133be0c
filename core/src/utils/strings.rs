//! Author: [Seclususs](https://github.com/seclususs)

#[inline]
pub fn validate_value(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == '=' || c == ' ' || c == '/'
    })
}

/// Parses `"512"`, `"64K"`, `"200M"`, `"1GiB"` and similar into bytes.
/// Suffixes are binary and case-insensitive.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(format!("'{input}' does not start with a number"));
    }
    let value = digits
        .parse::<u64>()
        .map_err(|e| format!("'{input}': {e}"))?;
    let multiplier: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        other => return Err(format!("unknown size suffix '{other}' in '{input}'")),
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("'{input}' overflows"))
}

/// Parses `"10%"` into a percentage in `0..=100`.
pub fn parse_percent(input: &str) -> Option<Result<u8, String>> {
    let number = input.trim().strip_suffix('%')?;
    Some(match number.trim().parse::<u8>() {
        Ok(pct) if pct <= 100 => Ok(pct),
        Ok(pct) => Err(format!("{pct}% exceeds 100%")),
        Err(e) => Err(format!("'{input}': {e}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_with_suffixes() {
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("64K"), Ok(64 * 1024));
        assert_eq!(parse_size("200M"), Ok(200 << 20));
        assert_eq!(parse_size(" 1GiB "), Ok(1 << 30));
        assert_eq!(parse_size("3 mb"), Ok(3 << 20));
    }

    #[test]
    fn sizes_reject_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("M").is_err());
        assert!(parse_size("12T").is_err());
        assert!(parse_size("99999999999999999999G").is_err());
    }

    #[test]
    fn percentages() {
        assert_eq!(parse_percent("10%"), Some(Ok(10)));
        assert_eq!(parse_percent("100 %"), Some(Ok(100)));
        assert!(matches!(parse_percent("101%"), Some(Err(_))));
        assert_eq!(parse_percent("200M"), None);
    }

    #[test]
    fn values_allow_device_paths() {
        assert!(validate_value("/dev/sda2"));
        assert!(validate_value("lzo-rle"));
        assert!(!validate_value("lz4; reboot"));
    }
}
