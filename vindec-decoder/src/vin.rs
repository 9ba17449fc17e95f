//! VIN validation
//!
//! Input is cleaned by dropping every character outside `A-HJ-NPR-Z0-9`
//! (case-insensitive, so `i`, `o` and `q` are dropped too) and uppercasing
//! the rest. The result must be exactly 17 characters. The ISO 3779 check
//! digit is not verified.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Required VIN length
pub const VIN_LENGTH: usize = 17;

/// VIN validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VinError {
    #[error("Invalid VIN format: expected 17 characters, got {0}")]
    Length(usize),

    #[error("Invalid VIN format: character '{0}' is not allowed")]
    Character(char),
}

/// Normalized 17-character VIN
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vin(String);

/// True for the 33 characters a VIN may contain
pub fn is_vin_char(c: char) -> bool {
    matches!(c, 'A'..='H' | 'J'..='N' | 'P' | 'R'..='Z' | '0'..='9')
}

impl Vin {
    /// Validate and normalize raw input
    pub fn parse(raw: &str) -> Result<Self, VinError> {
        let cleaned: String = raw
            .chars()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| is_vin_char(*c))
            .collect();

        if cleaned.chars().count() != VIN_LENGTH {
            return Err(VinError::Length(cleaned.chars().count()));
        }

        // Second guard; the filter above should make this unreachable
        if let Some(bad) = cleaned.chars().find(|c| !is_vin_char(*c)) {
            return Err(VinError::Character(bad));
        }

        Ok(Vin(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Vin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Vin {
    type Error = VinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Vin::parse(&value)
    }
}

impl From<Vin> for String {
    fn from(vin: Vin) -> Self {
        vin.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1HGCM82633A123456";

    #[test]
    fn test_valid_vin_accepted() {
        let vin = Vin::parse(SAMPLE).unwrap();
        assert_eq!(vin.as_str(), SAMPLE);
    }

    #[test]
    fn test_lowercase_is_uppercased() {
        let vin = Vin::parse("1hgcm82633a123456").unwrap();
        assert_eq!(vin.as_str(), SAMPLE);
    }

    #[test]
    fn test_separators_are_stripped() {
        let vin = Vin::parse(" 1HG-CM8 2633/A12.3456 ").unwrap();
        assert_eq!(vin.as_str(), SAMPLE);
    }

    #[test]
    fn test_excluded_letters_are_stripped() {
        // I, O and Q never count toward the 17 characters
        let vin = Vin::parse("1HGCM82633A123456IOQioq").unwrap();
        assert_eq!(vin.as_str(), SAMPLE);

        assert_eq!(Vin::parse("1HGCM82633A12345O"), Err(VinError::Length(16)));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        assert_eq!(Vin::parse(""), Err(VinError::Length(0)));
        assert_eq!(Vin::parse("1HGCM82633A12345"), Err(VinError::Length(16)));
        assert_eq!(Vin::parse("1HGCM82633A1234567"), Err(VinError::Length(18)));
    }

    #[test]
    fn test_non_ascii_is_stripped() {
        assert_eq!(Vin::parse("ÉÉ1HGCM82633A123456").unwrap().as_str(), SAMPLE);
        assert!(Vin::parse("1HGCM82633A12345é").is_err());
    }

    #[test]
    fn test_check_digit_not_verified() {
        // Position 9 is deliberately wrong for ISO 3779
        assert!(Vin::parse("11111111211111111").is_ok());
    }

    #[test]
    fn test_parse_is_idempotent() {
        for raw in ["1hgcm82633a123456", "  JH4-KA7561-PC008269 ", "5YJSA1E26HF000337"] {
            let once = Vin::parse(raw).unwrap();
            let twice = Vin::parse(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_every_accepted_char_in_alphabet() {
        let alphabet: Vec<char> = ('A'..='Z').chain('0'..='9').filter(|c| is_vin_char(*c)).collect();
        assert_eq!(alphabet.len(), 33);
        assert!(!alphabet.contains(&'I'));
        assert!(!alphabet.contains(&'O'));
        assert!(!alphabet.contains(&'Q'));
    }

    #[test]
    fn test_serde_validates() {
        let vin: Vin = serde_json::from_str("\"1hgcm82633a123456\"").unwrap();
        assert_eq!(vin.as_str(), SAMPLE);
        assert!(serde_json::from_str::<Vin>("\"SHORT\"").is_err());
    }
}
