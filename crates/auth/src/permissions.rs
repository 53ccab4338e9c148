use serde::{Deserialize, Serialize};

/// Actions gated by role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    RecordTreatment,
    RecordDeath,
    RecordMovement,
    /// Create, restock, rename, reprice and retire medicines.
    ManagePharmacy,
    ReverseTreatment,
    /// See the whole ledger rather than the recent feed.
    ViewFullLedger,
    /// Super-admin console: create, suspend and extend farm units.
    ManageUnits,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::RecordTreatment => "ledger.treatment.record",
            Permission::RecordDeath => "ledger.death.record",
            Permission::RecordMovement => "ledger.movement.record",
            Permission::ManagePharmacy => "pharmacy.manage",
            Permission::ReverseTreatment => "ledger.treatment.reverse",
            Permission::ViewFullLedger => "ledger.read_all",
            Permission::ManageUnits => "units.manage",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
