use serde::{Deserialize, Serialize};

use boimedicado_core::ValueObject;

/// Ear-tag number of one animal: six digits, a hyphen and a check digit
/// (`123456-7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimalTag(String);

/// The input did not have the `NNNNNN-N` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTag(pub String);

impl core::fmt::Display for MalformedTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "malformed animal tag '{}' (expected 000000-0)", self.0)
    }
}

impl AnimalTag {
    /// Accepts exactly `^\d{6}-\d$` (ASCII digits, no surrounding spaces).
    pub fn parse(input: &str) -> Result<Self, MalformedTag> {
        let bytes = input.as_bytes();
        let well_formed = bytes.len() == 8
            && bytes[..6].iter().all(u8::is_ascii_digit)
            && bytes[6] == b'-'
            && bytes[7].is_ascii_digit();
        if well_formed {
            Ok(Self(input.to_string()))
        } else {
            Err(MalformedTag(input.to_string()))
        }
    }

    /// Apply the entry-field mask: keep at most seven digits and put the
    /// hyphen before the seventh.
    ///
    /// The result is only a valid tag once all seven digits are present.
    pub fn normalize_input(raw: &str) -> String {
        let digits: String = raw.chars().filter(char::is_ascii_digit).take(7).collect();
        if digits.len() <= 6 {
            digits
        } else {
            format!("{}-{}", &digits[..6], &digits[6..])
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The six-digit serial part.
    pub fn serial(&self) -> &str {
        &self.0[..6]
    }

    pub fn check_digit(&self) -> char {
        char::from(self.0.as_bytes()[7])
    }
}

impl ValueObject for AnimalTag {}

impl core::fmt::Display for AnimalTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AnimalTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<AnimalTag> for String {
    fn from(value: AnimalTag) -> Self {
        value.0
    }
}
