//! Read-only configuration snapshot consumed at validation time.
//!
//! The outer layer refreshes it on its own schedule (live subscription, manual
//! edit); validation only ever sees one immutable snapshot.

use serde::{Deserialize, Serialize};

use boimedicado_pharmacy::MedicineCode;

/// Treatment forms offer this many medication slots.
pub const MAX_MEDICATION_LINES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMedicine {
    pub code: MedicineCode,
    pub label: String,
}

/// Corral, paddock or lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLocation {
    pub code: String,
    pub label: String,
}

/// Standard medicines for a diagnosis, in administration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentProtocol {
    pub diagnosis: String,
    pub medicines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Bumped by the publisher on every refresh.
    pub revision: u64,
    pub medicines: Vec<CatalogMedicine>,
    pub diseases: Vec<String>,
    pub locations: Vec<CatalogLocation>,
    pub protocols: Vec<TreatmentProtocol>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_medicine(mut self, label: &str) -> Self {
        if let Ok(code) = MedicineCode::from_name(label) {
            self.medicines.push(CatalogMedicine {
                code,
                label: label.trim().to_string(),
            });
        }
        self
    }

    pub fn with_disease(mut self, label: impl Into<String>) -> Self {
        self.diseases.push(label.into());
        self
    }

    pub fn with_location(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.locations.push(CatalogLocation {
            code: code.into(),
            label: label.into(),
        });
        self
    }

    pub fn with_protocol(mut self, diagnosis: impl Into<String>, medicines: &[&str]) -> Self {
        self.protocols.push(TreatmentProtocol {
            diagnosis: diagnosis.into(),
            medicines: medicines.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    /// Resolve a typed or selected medicine label to a known medicine.
    ///
    /// Matches the derived code first (`"Draxxin"` and `"draxxin"` both hit
    /// `draxxin`), then the display label case-insensitively so renamed
    /// medicines still resolve.
    pub fn resolve_medicine(&self, label: &str) -> Option<&CatalogMedicine> {
        let wanted = label.trim();
        if wanted.is_empty() {
            return None;
        }
        if let Ok(code) = MedicineCode::from_name(wanted) {
            if let Some(found) = self.medicines.iter().find(|m| m.code == code) {
                return Some(found);
            }
        }
        self.medicines
            .iter()
            .find(|m| m.label.eq_ignore_ascii_case(wanted))
    }

    /// Display label for a location reference; unknown references pass through.
    pub fn location_label(&self, reference: &str) -> String {
        let reference = reference.trim();
        self.locations
            .iter()
            .find(|l| l.code == reference)
            .map(|l| l.label.clone())
            .unwrap_or_else(|| reference.to_string())
    }

    pub fn knows_disease(&self, label: &str) -> bool {
        self.diseases.iter().any(|d| d == label.trim())
    }

    /// Medicines the protocol for `diagnosis` prescribes, capped at the
    /// number of form slots. Empty when no protocol exists.
    pub fn suggested_medications(&self, diagnosis: &str) -> Vec<String> {
        self.protocols
            .iter()
            .find(|p| p.diagnosis == diagnosis.trim())
            .map(|p| p.medicines.iter().take(MAX_MEDICATION_LINES).cloned().collect())
            .unwrap_or_default()
    }
}
