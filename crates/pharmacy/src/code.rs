use serde::{Deserialize, Serialize};

use boimedicado_core::{DomainError, ValueObject};

/// Tolerance used when comparing millilitre quantities.
///
/// Doses are typed by hand with at most a couple of decimals; anything below
/// this is float noise from accumulated additions and subtractions.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Unique medicine code within a farm unit, derived from the display name.
///
/// `"Draxxin Plus"` becomes `draxxin_plus`: trimmed, lowercased, each run of
/// whitespace collapsed to a single underscore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MedicineCode(String);

impl MedicineCode {
    pub fn from_name(name: &str) -> Result<Self, DomainError> {
        let code = name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_");
        if code.is_empty() {
            return Err(DomainError::validation("medicine name cannot be empty"));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for MedicineCode {}

impl core::fmt::Display for MedicineCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MedicineCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

impl From<MedicineCode> for String {
    fn from(value: MedicineCode) -> Self {
        value.0
    }
}

/// A non-negative, finite quantity of liquid medicine in millilitres.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Millilitres(f64);

impl Millilitres {
    pub const ZERO: Millilitres = Millilitres(0.0);

    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::validation("quantity must be a finite number"));
        }
        if value < 0.0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(Self(value))
    }

    /// A dose: strictly positive.
    pub fn dose(value: f64) -> Result<Self, DomainError> {
        let ml = Self::new(value)?;
        if !ml.is_positive() {
            return Err(DomainError::validation("dose must be greater than zero"));
        }
        Ok(ml)
    }

    /// Parse a typed dose, accepting `,` as the decimal separator.
    ///
    /// Returns `None` for blank, malformed or non-positive input.
    pub fn parse_dose(input: &str) -> Option<Self> {
        let normalized = input.trim().replace(',', ".");
        if normalized.is_empty() {
            return None;
        }
        let value: f64 = normalized.parse().ok()?;
        Self::dose(value).ok()
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > QUANTITY_EPSILON
    }

    pub fn saturating_add(self, other: Millilitres) -> Millilitres {
        let sum = self.0 + other.0;
        if sum.is_finite() { Self(sum) } else { Self(f64::MAX) }
    }

    /// `self - other`, or `None` if that would go below zero.
    ///
    /// Results within [`QUANTITY_EPSILON`] of zero snap to exactly zero.
    pub fn checked_sub(self, other: Millilitres) -> Option<Millilitres> {
        let diff = self.0 - other.0;
        if diff < -QUANTITY_EPSILON {
            return None;
        }
        if diff.abs() <= QUANTITY_EPSILON {
            return Some(Self::ZERO);
        }
        Some(Self(diff))
    }
}

impl ValueObject for Millilitres {}

impl core::fmt::Display for Millilitres {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} mL", self.0)
    }
}

impl TryFrom<f64> for Millilitres {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Millilitres> for f64 {
    fn from(value: Millilitres) -> Self {
        value.0
    }
}
