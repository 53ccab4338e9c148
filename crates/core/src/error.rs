//! Errors raised by stock rows, ledger entries and farm units themselves.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rule of the farm's books was broken.
///
/// Only failures that replaying the same input would reproduce live here.
/// A store that is down or a lock that was poisoned is reported by the infra
/// error types instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input a farm hand could fix: a blank name, a negative price, a date
    /// out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command reached the wrong row, or a retired medicine.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Unit, user or record id that does not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Command addressed to a medicine that was never created.
    #[error("not found")]
    NotFound,

    /// Stale row version or duplicate medicine.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
