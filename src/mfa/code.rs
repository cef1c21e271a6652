//! One-time code validation.
//!
//! Codes are always exactly six ASCII digits, submitted as a string so
//! leading zeros stay significant. Validation happens locally, before any
//! provider round trip.

use crate::mfa::error::MfaError;
use std::fmt;

/// Number of digits in a TOTP code.
pub const CODE_DIGITS: usize = 6;

/// A validated six-digit one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Normalize user input into a valid code.
    ///
    /// Whitespace and hyphen separators are stripped ("123 456" and
    /// "123-456" are common paste formats); anything else non-numeric is
    /// rejected, as is any length other than six digits.
    ///
    /// # Errors
    /// Returns `MfaError::Validation` when the input is empty, contains
    /// non-digit characters, or is not exactly six digits long.
    pub fn parse(input: &str) -> Result<Self, MfaError> {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if normalized.is_empty() {
            return Err(MfaError::Validation("code is required"));
        }
        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(MfaError::Validation("code must contain only digits"));
        }
        if normalized.len() != CODE_DIGITS {
            return Err(MfaError::Validation("code must be exactly 6 digits"));
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
