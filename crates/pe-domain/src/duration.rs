//! Duration string parsing: `"30s"`, `"5m"`, `"2h"`, `"1d"`, `"100ms"`, and
//! composites like `"1h30m"`.

use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid duration token '{0}'")]
    InvalidToken(String),
    #[error("unknown duration unit '{0}' in '{1}' (expected ms, s, m, h, d)")]
    UnknownUnit(String, String),
}

/// Parses a duration string composed of one or more `<number><unit>` tokens,
/// e.g. `"30s"`, `"1h30m"`. Units: `ms`, `s`, `m`, `h`, `d`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut chars = input.char_indices().peekable();
    let mut consumed_any = false;

    while let Some(&(start, c)) = chars.peek() {
        if !c.is_ascii_digit() {
            return Err(DurationParseError::InvalidToken(input.to_string()));
        }
        let mut end = start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_digit() {
                end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let number_str = &input[start..end];

        let unit_start = end;
        let mut unit_end = unit_start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit_end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let unit = &input[unit_start..unit_end];

        let value: u64 = number_str
            .parse()
            .map_err(|_| DurationParseError::InvalidToken(input.to_string()))?;

        let unit_duration = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            "d" => Duration::from_secs(value * 86400),
            other => {
                return Err(DurationParseError::UnknownUnit(
                    other.to_string(),
                    input.to_string(),
                ))
            }
        };

        total += unit_duration;
        consumed_any = true;
    }

    if !consumed_any {
        return Err(DurationParseError::InvalidToken(input.to_string()));
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn parses_composite_duration() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(3600 + 1800)
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert_eq!(parse_duration("   "), Err(DurationParseError::Empty));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(matches!(
            parse_duration("10x"),
            Err(DurationParseError::UnknownUnit(_, _))
        ));
    }

    #[test]
    fn rejects_missing_unit() {
        assert!(matches!(
            parse_duration("10"),
            Err(DurationParseError::UnknownUnit(_, _))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("abc").is_err());
    }
}
