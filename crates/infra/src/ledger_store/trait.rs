use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use boimedicado_core::{RecordId, UnitId};
use boimedicado_ledger::{LedgerEntry, LedgerQuery, LedgerRecord};

/// An entry ready to be appended (no sequence number yet).
///
/// Identity and commit time are assigned by the store when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncommittedRecord {
    pub id: Option<RecordId>,
    pub unit_id: UnitId,
    pub recorded_at_millis: Option<i64>,
    pub recorded_by: String,
    pub entry: LedgerEntry,
}

impl UncommittedRecord {
    pub fn new(unit_id: UnitId, recorded_by: impl Into<String>, entry: LedgerEntry) -> Self {
        Self {
            id: None,
            unit_id,
            recorded_at_millis: None,
            recorded_by: recorded_by.into(),
            entry,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn recorded_at(mut self, millis: i64) -> Self {
        self.recorded_at_millis = Some(millis);
        self
    }
}

#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("record {0} already exists")]
    Duplicate(RecordId),

    #[error("unit isolation violation: {0}")]
    TenantIsolation(String),

    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// The record is stored; only its publication failed.
    #[error("record publication failed: {reason}")]
    Publish { record: Box<LedgerRecord>, reason: String },
}

/// Append-only, unit-scoped ledger.
///
/// Implementations must:
/// - assign a 1-based, gap-free `sequence` per unit
/// - reject an append whose id already exists
/// - never return records of another unit
pub trait LedgerStore: Send + Sync {
    fn append(&self, record: UncommittedRecord) -> Result<LedgerRecord, LedgerStoreError>;

    /// `Ok(None)` when no record has this id.
    fn get(&self, unit_id: UnitId, id: RecordId) -> Result<Option<LedgerRecord>, LedgerStoreError>;

    /// Most recent first, see [`boimedicado_ledger::most_recent_first`].
    fn query(&self, query: &LedgerQuery) -> Result<Vec<LedgerRecord>, LedgerStoreError>;

    /// Records not yet pushed upstream, oldest first.
    fn pending(&self, unit_id: UnitId) -> Result<Vec<LedgerRecord>, LedgerStoreError>;

    /// Flag records as synced; returns how many changed state.
    fn mark_synced(&self, unit_id: UnitId, ids: &[RecordId]) -> Result<usize, LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, record: UncommittedRecord) -> Result<LedgerRecord, LedgerStoreError> {
        (**self).append(record)
    }

    fn get(&self, unit_id: UnitId, id: RecordId) -> Result<Option<LedgerRecord>, LedgerStoreError> {
        (**self).get(unit_id, id)
    }

    fn query(&self, query: &LedgerQuery) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        (**self).query(query)
    }

    fn pending(&self, unit_id: UnitId) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        (**self).pending(unit_id)
    }

    fn mark_synced(&self, unit_id: UnitId, ids: &[RecordId]) -> Result<usize, LedgerStoreError> {
        (**self).mark_synced(unit_id, ids)
    }
}
