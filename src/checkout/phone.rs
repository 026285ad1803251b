// Phone number normalisation for customer lookup (Sri Lankan numbering)

use regex::Regex;
use std::sync::LazyLock;

use crate::checkout::errors::ValidationError;

static E164_LK: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\+94\d{9}$"));

/// Normalise a typed phone number to `+94XXXXXXXXX`.
///
/// Digits are extracted first. `0XXXXXXXXX` and `94XXXXXXXXX` get the `+94`
/// prefix, a bare nine digit number gets `+94` prepended. Anything else is
/// returned unchanged.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 10 && digits.starts_with('0') {
        format!("+94{}", &digits[1..])
    } else if digits.len() == 11 && digits.starts_with("94") {
        format!("+{digits}")
    } else if digits.len() == 9 {
        format!("+94{digits}")
    } else {
        raw.to_string()
    }
}

pub fn is_valid_phone(raw: &str) -> bool {
    let normalized = normalize_phone(raw);
    match E164_LK.as_ref() {
        Ok(pattern) => pattern.is_match(&normalized),
        Err(_) => false,
    }
}

/// Normalise and validate, for payloads that are written to the registry
pub fn validated_phone(raw: &str) -> Result<String, ValidationError> {
    if is_valid_phone(raw) {
        Ok(normalize_phone(raw))
    } else {
        Err(ValidationError::InvalidPhone {
            phone: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_shapes() {
        assert_eq!(normalize_phone("0771234567"), "+94771234567");
        assert_eq!(normalize_phone("94771234567"), "+94771234567");
        assert_eq!(normalize_phone("771234567"), "+94771234567");
        assert_eq!(normalize_phone("+94771234567"), "+94771234567");
    }

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize_phone("077 123 4567"), "+94771234567");
        assert_eq!(normalize_phone("(077) 123-4567"), "+94771234567");
    }

    #[test]
    fn test_normalize_passes_through_unknown_shapes() {
        assert_eq!(normalize_phone("077"), "077");
        assert_eq!(normalize_phone("+1 555 0100"), "+1 555 0100");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_validation() {
        assert!(is_valid_phone("0771234567"));
        assert!(!is_valid_phone("12345"));
        assert_eq!(validated_phone("771234567").unwrap(), "+94771234567");
        assert!(matches!(
            validated_phone("555-0100"),
            Err(ValidationError::InvalidPhone { .. })
        ));
    }
}
