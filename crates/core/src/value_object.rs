//! Value object trait: equality by value, not identity.
//!
//! Animal tags, medicine codes, doses and medication lines are value objects:
//! two doses of `2.5` mL are the same dose, whichever treatment they belong to.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Dose { millilitres: f64 }
///
/// impl ValueObject for Dose {}
///
/// assert_eq!(Dose { millilitres: 2.5 }, Dose { millilitres: 2.5 });
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
