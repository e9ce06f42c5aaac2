//! Human-friendly retention intervals for `prune-backups`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("duration cannot be empty")]
    Empty,
    #[error("invalid duration format: {0}")]
    InvalidFormat(String),
    #[error("unsupported duration unit: {0}")]
    UnknownUnit(char),
}

/// Parse retention intervals like `30d`, `12h`, `45s`, or compound forms
/// like `1d12h`. Units are days, hours, minutes, and seconds,
/// case-insensitive.
pub fn parse_retention(input: &str) -> Result<Duration, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut total_secs: u64 = 0;
    let mut digits = String::new();
    let mut saw_segment = false;

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return Err(ParseError::InvalidFormat(trimmed.to_string()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| ParseError::InvalidFormat(trimmed.to_string()))?;
        let unit_secs = match ch.to_ascii_lowercase() {
            'd' => 24 * 60 * 60,
            'h' => 60 * 60,
            'm' => 60,
            's' => 1,
            other => return Err(ParseError::UnknownUnit(other)),
        };
        total_secs = total_secs.saturating_add(value.saturating_mul(unit_secs));
        digits.clear();
        saw_segment = true;
    }

    // A trailing number without a unit is ambiguous, reject it.
    if !digits.is_empty() || !saw_segment {
        return Err(ParseError::InvalidFormat(trimmed.to_string()));
    }

    Ok(Duration::from_secs(total_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_retention("30d").unwrap(), Duration::from_secs(30 * 86400));
        assert_eq!(parse_retention("12H").unwrap(), Duration::from_secs(12 * 3600));
        assert_eq!(parse_retention("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_retention("45s").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_compound() {
        assert_eq!(
            parse_retention("1d12h").unwrap(),
            Duration::from_secs(86400 + 12 * 3600)
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(parse_retention(" 2h ").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(parse_retention(""), Err(ParseError::Empty));
        assert_eq!(parse_retention("   "), Err(ParseError::Empty));
        assert!(matches!(parse_retention("30"), Err(ParseError::InvalidFormat(_))));
        assert!(matches!(parse_retention("d30"), Err(ParseError::InvalidFormat(_))));
        assert_eq!(parse_retention("30w"), Err(ParseError::UnknownUnit('w')));
        assert!(matches!(parse_retention("abc"), Err(ParseError::InvalidFormat(_))));
    }
}
