//! Cron schedule parsing and preset normalization.

use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid cron expression '{0}': {1}")]
    InvalidCron(String, String),
}

/// Normalizes a cron preset (`hourly|daily|weekly|monthly|weekdays`) to a
/// 5-field cron expression, or passes an already-5-field expression through.
pub fn normalize_cron(raw: &str) -> &str {
    match raw.trim() {
        "hourly" => "0 * * * *",
        "daily" => "0 0 * * *",
        "weekly" => "0 0 * * 0",
        "monthly" => "0 0 1 * *",
        "weekdays" => "0 0 * * 1-5",
        other => other,
    }
}

/// Validates a cron expression (after preset normalization) via standard
/// 5-field cron semantics.
pub fn validate_cron(raw: &str) -> Result<(), ScheduleError> {
    let normalized = normalize_cron(raw);
    // The `cron` crate parses 6/7-field (with seconds) expressions; prepend
    // a seconds field of `0` to accept the 5-field schedules this engine uses.
    let six_field = format!("0 {normalized}");
    cron::Schedule::from_str(&six_field)
        .map(|_| ())
        .map_err(|e| ScheduleError::InvalidCron(raw.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_presets() {
        assert_eq!(normalize_cron("hourly"), "0 * * * *");
        assert_eq!(normalize_cron("daily"), "0 0 * * *");
        assert_eq!(normalize_cron("weekly"), "0 0 * * 0");
        assert_eq!(normalize_cron("monthly"), "0 0 1 * *");
        assert_eq!(normalize_cron("weekdays"), "0 0 * * 1-5");
    }

    #[test]
    fn passes_through_explicit_expression() {
        assert_eq!(normalize_cron("*/15 * * * *"), "*/15 * * * *");
    }

    #[test]
    fn validates_presets() {
        assert!(validate_cron("hourly").is_ok());
        assert!(validate_cron("daily").is_ok());
        assert!(validate_cron("weekdays").is_ok());
    }

    #[test]
    fn validates_explicit_expression() {
        assert!(validate_cron("*/15 * * * *").is_ok());
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(validate_cron("not a cron").is_err());
        assert!(validate_cron("99 * * * *").is_err());
    }
}
