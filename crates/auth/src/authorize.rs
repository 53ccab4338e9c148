use thiserror::Error;

use boimedicado_core::UnitId;

use crate::{Actor, Permission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unit mismatch")]
    UnitMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Check that `actor` may perform `required` inside `unit_id`.
///
/// - No IO
/// - No panics
/// - Units never cross, whatever the role
pub fn authorize(actor: &Actor, unit_id: UnitId, required: Permission) -> Result<(), AuthzError> {
    if actor.unit_id != unit_id {
        return Err(AuthzError::UnitMismatch);
    }
    if actor.role.allows(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}
