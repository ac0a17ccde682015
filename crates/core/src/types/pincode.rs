//! Indian postal index number.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PincodeError {
    /// Wrong number of characters.
    #[error("pincode must be exactly {expected} digits")]
    WrongLength {
        /// Required length.
        expected: usize,
    },
    /// Contains something other than ASCII digits.
    #[error("pincode must contain digits only")]
    NonDigit,
}

/// A six-digit pincode.
///
/// ```
/// use ahmed_mart_core::Pincode;
///
/// assert!(Pincode::parse("560001").is_ok());
/// assert!(Pincode::parse("56001").is_err());
/// assert!(Pincode::parse("56000A").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Pincode(String);

impl Pincode {
    /// Number of digits in a pincode.
    pub const LENGTH: usize = 6;

    /// Parse a pincode, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, PincodeError> {
        let s = s.trim();
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PincodeError::NonDigit);
        }
        if s.len() != Self::LENGTH {
            return Err(PincodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the pincode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Pincode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            Pincode::parse(" 110001 ").map(|p| p.as_str().to_owned()),
            Ok("110001".to_owned())
        );
    }

    #[test]
    fn test_length_checked() {
        assert_eq!(
            Pincode::parse("1100011"),
            Err(PincodeError::WrongLength { expected: 6 })
        );
        assert_eq!(
            Pincode::parse(""),
            Err(PincodeError::WrongLength { expected: 6 })
        );
    }

    #[test]
    fn test_letters_rejected() {
        assert_eq!(Pincode::parse("11OO01"), Err(PincodeError::NonDigit));
    }
}
