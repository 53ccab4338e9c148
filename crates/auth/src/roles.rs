use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role of a user within a farm unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    Operator,
}

const OPERATOR: &[Permission] = &[
    Permission::RecordTreatment,
    Permission::RecordDeath,
    Permission::RecordMovement,
];

const MANAGER: &[Permission] = &[
    Permission::RecordTreatment,
    Permission::RecordDeath,
    Permission::RecordMovement,
    Permission::ManagePharmacy,
    Permission::ReverseTreatment,
    Permission::ViewFullLedger,
];

const SUPER_ADMIN: &[Permission] = &[
    Permission::RecordTreatment,
    Permission::RecordDeath,
    Permission::RecordMovement,
    Permission::ManagePharmacy,
    Permission::ReverseTreatment,
    Permission::ViewFullLedger,
    Permission::ManageUnits,
];

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SuperAdmin => SUPER_ADMIN,
            Role::Manager => MANAGER,
            Role::Operator => OPERATOR,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Manager => "manager",
            Role::Operator => "operator",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
