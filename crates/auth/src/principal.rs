use serde::{Deserialize, Serialize};

use boimedicado_core::{UnitId, UserId};

use crate::Role;

/// The authenticated user a write is attributed to.
///
/// Supplied by the identity provider; the core treats it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
    pub unit_id: UnitId,
    pub role: Role,
}

impl Actor {
    pub fn new(display_name: impl Into<String>, unit_id: UnitId, role: Role) -> Self {
        Self {
            user_id: UserId::new(),
            display_name: display_name.into(),
            unit_id,
            role,
        }
    }

    /// Display name to stamp on records, or `fallback` when blank.
    pub fn recorded_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        let name = self.display_name.trim();
        if name.is_empty() { fallback } else { name }
    }
}
