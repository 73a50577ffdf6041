use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::crawler::RateLimit;

static DURATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*(ms|s|m|h|d)\s*$").unwrap());

static BYTE_SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*(b|kb|mb|gb|tb)?\s*$").unwrap());

/// Parses `<n><unit>` with unit one of `ms`, `s`, `m`, `h`, `d`
pub fn parse_duration(value: &str) -> Result<Duration> {
    let Some(caps) = DURATION_REGEX.captures(value) else {
        bail!("Invalid duration '{}', expected e.g. 500ms, 30s, 5m, 6h or 1d", value);
    };
    let n: u64 = caps[1]
        .parse()
        .with_context(|| format!("Duration out of range: {}", value))?;
    let secs = |mult: u64| {
        n.checked_mul(mult)
            .map(Duration::from_secs)
            .with_context(|| format!("Duration out of range: {}", value))
    };

    match caps[2].to_ascii_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(n)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        "d" => secs(24 * 60 * 60),
        unit => bail!("Unknown duration unit '{}'", unit),
    }
}

/// Parses a human-readable size such as `5mb`. A bare number is bytes.
pub fn parse_byte_size(value: &str) -> Result<u64> {
    let Some(caps) = BYTE_SIZE_REGEX.captures(value) else {
        bail!("Invalid size '{}', expected e.g. 512kb or 5mb", value);
    };
    let n: u64 = caps[1]
        .parse()
        .with_context(|| format!("Size out of range: {}", value))?;
    let shift = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        None | Some("b") => 0,
        Some("kb") => 10,
        Some("mb") => 20,
        Some("gb") => 30,
        Some("tb") => 40,
        Some(unit) => bail!("Unknown size unit '{}'", unit),
    };
    n.checked_mul(1u64 << shift)
        .with_context(|| format!("Size out of range: {}", value))
}

/// Parses `<count>/<unit>` where unit is `s`, `m`, `h` or any duration (`10/2s`)
pub fn parse_rate_limit(value: &str) -> Result<RateLimit> {
    let Some((count, unit)) = value.split_once('/') else {
        bail!("Invalid rate limit '{}', expected e.g. 10/s", value);
    };
    let count: u32 = count
        .trim()
        .parse()
        .with_context(|| format!("Invalid request count in rate limit '{}'", value))?;
    let per = match unit.trim().to_ascii_lowercase().as_str() {
        "s" => Duration::from_secs(1),
        "m" => Duration::from_secs(60),
        "h" => Duration::from_secs(60 * 60),
        other => parse_duration(other)
            .with_context(|| format!("Invalid interval in rate limit '{}'", value))?,
    };
    RateLimit::new(count, per)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("6H").unwrap(), Duration::from_secs(6 * 3600));
        assert_eq!(parse_duration(" 1d ").unwrap(), Duration::from_secs(86_400));
        assert!(parse_duration("6").is_err());
        assert!(parse_duration("1w").is_err());
        assert!(parse_duration("h").is_err());
    }

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("512").unwrap(), 512);
        assert_eq!(parse_byte_size("10b").unwrap(), 10);
        assert_eq!(parse_byte_size("2kb").unwrap(), 2048);
        assert_eq!(parse_byte_size("5MB").unwrap(), 5 * 1024 * 1024);
        assert_eq!(parse_byte_size("1gb").unwrap(), 1 << 30);
        assert_eq!(parse_byte_size("1tb").unwrap(), 1 << 40);
        assert!(parse_byte_size("5 parsecs").is_err());
        assert!(parse_byte_size("99999999999tb").is_err());
    }

    #[test]
    fn test_parse_rate_limit() {
        let rate = parse_rate_limit("10/s").unwrap();
        assert_eq!(rate.requests.get(), 10);
        assert_eq!(rate.per, Duration::from_secs(1));

        let rate = parse_rate_limit("30/m").unwrap();
        assert_eq!(rate.period(), Duration::from_secs(2));

        let rate = parse_rate_limit("5/2s").unwrap();
        assert_eq!(rate.per, Duration::from_secs(2));

        assert!(parse_rate_limit("10").is_err());
        assert!(parse_rate_limit("0/s").is_err());
        assert!(parse_rate_limit("x/s").is_err());
        assert!(parse_rate_limit("10/fortnight").is_err());
    }
}
