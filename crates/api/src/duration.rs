//! Kubernetes-style duration strings (`"10m"`, `"1h30m"`, `"1.5s"`, `"250ms"`).

use std::time::Duration;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
}

/// Requeue interval used when a Resource does not carry a usable one.
/// Override with `FERRY_DEFAULT_INTERVAL` (same textual format).
pub fn default_interval() -> Duration {
    std::env::var("FERRY_DEFAULT_INTERVAL")
        .ok()
        .and_then(|s| parse_duration(&s).ok())
        .unwrap_or(DEFAULT_INTERVAL)
}

/// Parse a sequence of `<decimal><unit>` pairs. Units: h, m, s, ms, us/µs, ns.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if num_len == 0 {
            return Err(DurationError::Invalid(input.to_string()));
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| DurationError::Invalid(input.to_string()))?;
        rest = &rest[num_len..];
        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let secs_per_unit = match unit {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            "" => return Err(DurationError::Invalid(input.to_string())),
            other => return Err(DurationError::UnknownUnit { unit: other.to_string(), input: input.to_string() }),
        };
        total += value * secs_per_unit;
    }
    Duration::try_from_secs_f64(total).map_err(|_| DurationError::Invalid(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration("").unwrap_err(), DurationError::Empty);
        assert!(matches!(parse_duration("10").unwrap_err(), DurationError::Invalid(_)));
        assert!(matches!(parse_duration("m10").unwrap_err(), DurationError::Invalid(_)));
        assert!(matches!(parse_duration("3d").unwrap_err(), DurationError::UnknownUnit { .. }));
    }
}
