//! One-time password codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    /// Nothing was entered.
    #[error("enter the code from your email")]
    Empty,
    /// The code contains something other than ASCII digits.
    #[error("the code must contain digits only")]
    NotNumeric,
    /// The code is shorter or longer than allowed.
    #[error("the code must be between {min} and {max} digits")]
    BadLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A numeric one-time password as typed by the user.
///
/// The backend compares codes numerically, so the value travels as a JSON
/// number. Leading zeros are not significant on the wire.
///
/// ```
/// use boighor_core::OtpCode;
///
/// let code = OtpCode::parse(" 482913 ").unwrap();
/// assert_eq!(code.value(), 482_913);
/// assert!(OtpCode::parse("48a913").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(u32);

impl OtpCode {
    /// Shortest accepted code.
    pub const MIN_DIGITS: usize = 4;
    /// Longest accepted code (the input field is capped at six).
    pub const MAX_DIGITS: usize = 6;

    /// Parse user input into a code.
    ///
    /// # Errors
    ///
    /// Returns [`OtpCodeError`] if the trimmed input is empty, non-numeric,
    /// or outside the accepted length.
    pub fn parse(input: &str) -> Result<Self, OtpCodeError> {
        let digits = input.trim();

        if digits.is_empty() {
            return Err(OtpCodeError::Empty);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpCodeError::NotNumeric);
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(OtpCodeError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| OtpCodeError::NotNumeric)
    }

    /// The numeric value sent to the backend.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

// Codes are credentials; keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl std::str::FromStr for OtpCode {
    type Err = OtpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_six_digits() {
        assert_eq!(OtpCode::parse("123456").unwrap().value(), 123_456);
    }

    #[test]
    fn test_parse_keeps_numeric_value_of_leading_zero() {
        assert_eq!(OtpCode::parse("012345").unwrap().value(), 12_345);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(OtpCode::parse(""), Err(OtpCodeError::Empty));
        assert_eq!(OtpCode::parse("12 34"), Err(OtpCodeError::NotNumeric));
        assert_eq!(OtpCode::parse("-1234"), Err(OtpCodeError::NotNumeric));
        assert!(matches!(
            OtpCode::parse("123"),
            Err(OtpCodeError::BadLength { .. })
        ));
        assert!(matches!(
            OtpCode::parse("1234567"),
            Err(OtpCodeError::BadLength { .. })
        ));
    }

    #[test]
    fn test_serializes_as_number() {
        let code = OtpCode::parse("654321").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "654321");
    }

    #[test]
    fn test_debug_is_redacted() {
        let code = OtpCode::parse("654321").unwrap();
        assert!(!format!("{code:?}").contains("654321"));
    }
}
