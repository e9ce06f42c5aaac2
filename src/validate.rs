//! Profile name validation.
//!
//! Names eventually become filesystem path segments, so they are treated as
//! attacker-controlled input: path navigation, null bytes, characters that
//! are unsafe on common filesystems, and reserved Windows device names are
//! all rejected. Checks run in a fixed order so callers always get the same
//! error for the same input.

use thiserror::Error;

/// Why a profile name was rejected.
///
/// Variants are matchable individually so the CLI can print a specific
/// remediation hint for each case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name cannot be empty")]
    Empty,
    #[error("name cannot be '.' or '..'")]
    DotNavigation,
    #[error("name contains a null byte")]
    NullByte,
    #[error("name contains non-printable characters")]
    NonPrintable,
    #[error("name contains invalid characters (<>:\"/\\|?*)")]
    InvalidChars,
    #[error("name is a reserved system filename")]
    ReservedName,
}

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Validate a profile name after trimming surrounding whitespace.
///
/// Checks, in order: empty, dot navigation, null bytes, non-printable
/// ASCII, invalid filesystem characters, reserved device names
/// (CON, PRN, AUX, NUL, COM1-COM9, LPT1-LPT9, case-insensitive).
pub fn validate_name(name: &str) -> Result<(), NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed == "." || trimmed == ".." {
        return Err(NameError::DotNavigation);
    }
    if trimmed.contains('\0') {
        return Err(NameError::NullByte);
    }
    // Printable ASCII only: 0x20..=0x7e.
    if trimmed.chars().any(|c| !(' '..='~').contains(&c)) {
        return Err(NameError::NonPrintable);
    }
    if trimmed.contains(INVALID_CHARS) {
        return Err(NameError::InvalidChars);
    }
    if is_reserved(trimmed) {
        return Err(NameError::ReservedName);
    }
    Ok(())
}

/// Trim and validate a name, returning the canonical form used as a
/// filesystem segment.
pub fn normalize_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    validate_name(trimmed)?;
    Ok(trimmed.to_string())
}

fn is_reserved(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    if matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL") {
        return true;
    }
    if upper.len() == 4 && (upper.starts_with("COM") || upper.starts_with("LPT")) {
        return matches!(upper.as_bytes()[3], b'1'..=b'9');
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_reasonable_names() {
        for name in ["work", "personal", "valid-name_1.2", "a b", "X"] {
            assert_eq!(validate_name(name), Ok(()), "{name:?}");
        }
    }

    #[test]
    fn test_rejection_order_and_kinds() {
        let cases: &[(&str, NameError)] = &[
            ("", NameError::Empty),
            ("  ", NameError::Empty),
            (".", NameError::DotNavigation),
            ("..", NameError::DotNavigation),
            (" .. ", NameError::DotNavigation),
            ("a\0b", NameError::NullByte),
            ("日本語", NameError::NonPrintable),
            ("tab\there", NameError::NonPrintable),
            ("a\u{7f}b", NameError::NonPrintable),
            ("a/b", NameError::InvalidChars),
            ("a\\b", NameError::InvalidChars),
            ("a*b", NameError::InvalidChars),
            ("a?b", NameError::InvalidChars),
            ("<name>", NameError::InvalidChars),
            ("CON", NameError::ReservedName),
            ("con", NameError::ReservedName),
            ("Com7", NameError::ReservedName),
            ("LPT9", NameError::ReservedName),
        ];
        for (input, expected) in cases {
            assert_eq!(validate_name(input), Err(*expected), "{input:?}");
        }
    }

    #[test]
    fn test_reserved_names_need_exact_match() {
        assert!(validate_name("CON1").is_ok());
        assert!(validate_name("CONSOLE").is_ok());
        assert!(validate_name("COM0").is_ok());
        assert!(validate_name("COM10").is_ok());
        assert!(validate_name("LPT").is_ok());
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_name("  work  ").unwrap(), "work");
        assert_eq!(normalize_name("  "), Err(NameError::Empty));
    }
}
