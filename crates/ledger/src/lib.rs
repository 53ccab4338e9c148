//! Treatment ledger domain: what gets recorded and how raw input is checked.
//!
//! Ledger entries are immutable facts. Corrections are new compensating
//! entries; nothing in this crate edits or removes a committed record.

pub mod catalog;
pub mod entry;
pub mod query;
pub mod tag;
pub mod validator;

pub use catalog::{CatalogLocation, CatalogMedicine, CatalogSnapshot, MAX_MEDICATION_LINES, TreatmentProtocol};
pub use entry::{
    LedgerEntry, LedgerRecord, MedicationLine, MovementKind, MovementSubject, RecordKind, SyncState,
};
pub use query::{LedgerQuery, most_recent_first};
pub use tag::{AnimalTag, MalformedTag};
pub use validator::{
    DeathRequest, MovementRequest, PlannedDose, RequestedMedication, TreatmentRequest, ValidatedDeath,
    ValidatedMovement, ValidatedTreatment, ValidationError, validate_death, validate_movement,
    validate_treatment,
};
