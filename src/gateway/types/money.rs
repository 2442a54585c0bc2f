//! Money types for API boundary enforcement
//!
//! - `StrictDecimal`: Format-validated input type
//! - `DisplayAmount`: Scale-6 output formatting

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::format_amount;

// ============================================================================
// StrictDecimal: Format-Validated Decimal at Serde Layer
// ============================================================================

/// Strict format Decimal - validates format during deserialization
///
/// Amounts travel as JSON strings only, so no value ever passes through a
/// binary float. Format rules:
/// - Rejects JSON numbers
/// - Rejects `.5` (must be `0.5`) and `5.` (must be `5` or `5.0`)
/// - Rejects empty strings, `+` prefix and scientific notation
///
/// Sign, scale and range are business rules checked by `RequestValidator`
/// so that errors can name the offending field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrictDecimal(Decimal);

impl StrictDecimal {
    /// Get the inner Decimal value
    pub fn inner(self) -> Decimal {
        self.0
    }

    #[cfg(test)]
    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }
}

impl std::ops::Deref for StrictDecimal {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StrictDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;

        if s.is_empty() {
            return Err(D::Error::custom("Amount cannot be empty"));
        }

        let digits = s.strip_prefix('-').unwrap_or(&s);
        if digits.starts_with('.') {
            return Err(D::Error::custom("Invalid format: use 0.5 not .5"));
        }
        if digits.ends_with('.') {
            return Err(D::Error::custom("Invalid format: use 5.0 not 5."));
        }
        if s.contains('e') || s.contains('E') {
            return Err(D::Error::custom(
                "Invalid format: scientific notation not allowed",
            ));
        }
        if s.starts_with('+') {
            return Err(D::Error::custom("Invalid format: + prefix not allowed"));
        }

        let d = Decimal::from_str(&s)
            .map_err(|e| D::Error::custom(format!("Invalid decimal: {}", e)))?;

        Ok(StrictDecimal(d))
    }
}

impl Serialize for StrictDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

// ============================================================================
// DisplayAmount: Type-Safe Output for API Responses
// ============================================================================

/// Display amount for API responses, always six fractional digits and
/// always a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayAmount(String);

impl DisplayAmount {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Decimal> for DisplayAmount {
    fn from(value: Decimal) -> Self {
        Self(format_amount(value))
    }
}

impl std::fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DisplayAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<StrictDecimal, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_strict_decimal_valid_string() {
        let d = parse(r#""1.5""#).unwrap();
        assert_eq!(*d, Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn test_strict_decimal_keeps_sign_for_validator() {
        let d = parse(r#""-2""#).unwrap();
        assert!(d.is_sign_negative());
    }

    #[test]
    fn test_strict_decimal_rejects_json_number() {
        let err = parse("1.5").unwrap_err();
        assert!(err.to_string().contains("expected a string"));
    }

    #[test]
    fn test_strict_decimal_rejects_bad_formats() {
        for (json, needle) in [
            (r#"".5""#, "use 0.5 not .5"),
            (r#""-.5""#, "use 0.5 not .5"),
            (r#""5.""#, "use 5.0 not 5."),
            (r#""1.5e8""#, "scientific notation"),
            (r#""+1""#, "+ prefix"),
            (r#""""#, "cannot be empty"),
            (r#""abc""#, "Invalid decimal"),
        ] {
            let err = parse(json).unwrap_err();
            assert!(err.to_string().contains(needle), "{json}: {err}");
        }
    }

    #[test]
    fn test_display_amount_pads_to_six_digits() {
        let amount = DisplayAmount::from(Decimal::from_str("60").unwrap());
        assert_eq!(serde_json::to_string(&amount).unwrap(), r#""60.000000""#);
        let amount = DisplayAmount::from(Decimal::from_str("-0.5").unwrap());
        assert_eq!(amount.as_str(), "-0.500000");
    }
}
