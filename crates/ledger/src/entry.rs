use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use boimedicado_core::{RecordId, UnitId, ValueObject};
use boimedicado_events::Event;
use boimedicado_pharmacy::{MedicineCode, Millilitres};

use crate::tag::AnimalTag;

/// One medicine administered in a treatment, priced at commit time.
///
/// `cost_at_time` is frozen: later price changes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationLine {
    pub medicine_code: MedicineCode,
    pub medicine_name: String,
    pub dose: Millilitres,
    pub cost_at_time: f64,
}

impl ValueObject for MedicationLine {}

/// Direction of a stock (herd) movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Entry,
    Slaughter,
    ReturnToPasture,
    Butcher,
}

/// What a movement counts: one tagged animal or a headcount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum MovementSubject {
    Tagged { animal_tag: AnimalTag },
    Headcount { quantity: u32 },
}

impl MovementSubject {
    pub fn head_count(&self) -> u32 {
        match self {
            MovementSubject::Tagged { .. } => 1,
            MovementSubject::Headcount { quantity } => *quantity,
        }
    }
}

/// A recorded event, one variant per record type with its own required fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Treatment {
        animal_tag: AnimalTag,
        occurred_on: NaiveDate,
        location: String,
        conditions: Vec<String>,
        medications: Vec<MedicationLine>,
    },
    Death {
        animal_tag: AnimalTag,
        occurred_on: NaiveDate,
        location: String,
        cause: String,
    },
    Movement {
        subject: MovementSubject,
        occurred_on: NaiveDate,
        location: String,
        kind: MovementKind,
    },
    /// Compensates an earlier treatment; its doses went back into stock.
    /// Carries the treatment's tag, date and location so period and
    /// location filters select both together.
    Reversal {
        reverses: RecordId,
        animal_tag: AnimalTag,
        occurred_on: NaiveDate,
        location: String,
        reason: String,
        restocked: Vec<MedicationLine>,
    },
}

/// Flat record type, used for filtering and dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Treatment,
    Death,
    Entry,
    Slaughter,
    ReturnToPasture,
    Butcher,
    Reversal,
}

impl From<MovementKind> for RecordKind {
    fn from(value: MovementKind) -> Self {
        match value {
            MovementKind::Entry => RecordKind::Entry,
            MovementKind::Slaughter => RecordKind::Slaughter,
            MovementKind::ReturnToPasture => RecordKind::ReturnToPasture,
            MovementKind::Butcher => RecordKind::Butcher,
        }
    }
}

impl LedgerEntry {
    pub fn kind(&self) -> RecordKind {
        match self {
            LedgerEntry::Treatment { .. } => RecordKind::Treatment,
            LedgerEntry::Death { .. } => RecordKind::Death,
            LedgerEntry::Movement { kind, .. } => RecordKind::from(*kind),
            LedgerEntry::Reversal { .. } => RecordKind::Reversal,
        }
    }

    pub fn occurred_on(&self) -> NaiveDate {
        match self {
            LedgerEntry::Treatment { occurred_on, .. }
            | LedgerEntry::Death { occurred_on, .. }
            | LedgerEntry::Movement { occurred_on, .. }
            | LedgerEntry::Reversal { occurred_on, .. } => *occurred_on,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            LedgerEntry::Treatment { location, .. }
            | LedgerEntry::Death { location, .. }
            | LedgerEntry::Movement { location, .. }
            | LedgerEntry::Reversal { location, .. } => location,
        }
    }

    pub fn animal_tag(&self) -> Option<&AnimalTag> {
        match self {
            LedgerEntry::Treatment { animal_tag, .. }
            | LedgerEntry::Death { animal_tag, .. }
            | LedgerEntry::Reversal { animal_tag, .. } => Some(animal_tag),
            LedgerEntry::Movement { subject, .. } => match subject {
                MovementSubject::Tagged { animal_tag } => Some(animal_tag),
                MovementSubject::Headcount { .. } => None,
            },
        }
    }

    /// Medication lines consumed by this entry (empty for non-treatments).
    pub fn medications(&self) -> &[MedicationLine] {
        match self {
            LedgerEntry::Treatment { medications, .. } => medications,
            _ => &[],
        }
    }

    /// Sum of `cost_at_time` over the administered lines.
    pub fn treatment_cost(&self) -> f64 {
        self.medications().iter().map(|m| m.cost_at_time).sum()
    }
}

/// Whether a record has been pushed to the remote store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Pending,
    Synced,
}

/// A committed ledger entry with its identity and commit metadata.
///
/// Records are immutable once built. The only store-side state is
/// `sync_state`, which describes the copy rather than the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    id: RecordId,
    unit_id: UnitId,
    /// Insertion position within the unit's ledger (1-based).
    sequence: u64,
    recorded_at_millis: i64,
    recorded_by: String,
    sync_state: SyncState,
    entry: LedgerEntry,
}

impl LedgerRecord {
    pub fn new(
        id: RecordId,
        unit_id: UnitId,
        sequence: u64,
        recorded_at_millis: i64,
        recorded_by: impl Into<String>,
        sync_state: SyncState,
        entry: LedgerEntry,
    ) -> Self {
        Self {
            id,
            unit_id,
            sequence,
            recorded_at_millis,
            recorded_by: recorded_by.into(),
            sync_state,
            entry,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn recorded_at_millis(&self) -> i64 {
        self.recorded_at_millis
    }

    pub fn recorded_by(&self) -> &str {
        &self.recorded_by
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn entry(&self) -> &LedgerEntry {
        &self.entry
    }

    pub fn kind(&self) -> RecordKind {
        self.entry.kind()
    }

    /// Copy of this record as seen with a different sync flag.
    pub fn with_sync_state(&self, sync_state: SyncState) -> Self {
        Self {
            sync_state,
            ..self.clone()
        }
    }
}

impl Event for LedgerRecord {
    fn event_type(&self) -> &'static str {
        match self.entry {
            LedgerEntry::Treatment { .. } => "ledger.treatment.recorded",
            LedgerEntry::Death { .. } => "ledger.death.recorded",
            LedgerEntry::Movement { .. } => "ledger.movement.recorded",
            LedgerEntry::Reversal { .. } => "ledger.treatment.reversed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.recorded_at_millis)
            .single()
            .unwrap_or_default()
    }
}
