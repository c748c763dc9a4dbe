//! Human-readable durations for config fields.
//!
//! Values are an unsigned integer followed by an optional unit: `ms`, `s`,
//! `m` or `h`. A bare number counts as seconds.

use std::time::Duration;

/// Parse `"500ms"`, `"6s"`, `"1m"`, `"2h"` or a bare number of seconds.
///
/// ```
/// use container_warden::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("10s"), Some(Duration::from_secs(10)));
/// assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration_string("7"), Some(Duration::from_secs(7)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    let per_unit_ms: u64 = match unit.trim_start() {
        "ms" => 1,
        "" | "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        _ => return None,
    };
    value.checked_mul(per_unit_ms).map(Duration::from_millis)
}

/// Serde adapter for duration fields written as strings ("6s") or bare
/// integer seconds.
pub(crate) mod serde_duration {
    use super::parse_duration_string;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration_string(&text).ok_or_else(|| {
                de::Error::custom(format!(
                    "invalid duration '{}' (expected e.g. \"500ms\", \"6s\", \"1m\")",
                    text
                ))
            }),
        }
    }

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }
}
