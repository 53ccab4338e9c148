use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use boimedicado_core::{RecordId, UnitId};
use boimedicado_ledger::{LedgerQuery, LedgerRecord, SyncState};

use super::r#trait::{LedgerStore, LedgerStoreError, UncommittedRecord};

#[derive(Debug, Default)]
struct Inner {
    /// Per-unit records in insertion order; `sequence - 1` is the index.
    units: HashMap<UnitId, Vec<LedgerRecord>>,
    /// Global id index, used for duplicate and isolation checks.
    owners: HashMap<RecordId, UnitId>,
}

impl Inner {
    fn insert(&mut self, record: LedgerRecord) -> Result<(), LedgerStoreError> {
        if self.owners.contains_key(&record.id()) {
            return Err(LedgerStoreError::Duplicate(record.id()));
        }
        self.owners.insert(record.id(), record.unit_id());
        self.units.entry(record.unit_id()).or_default().push(record);
        Ok(())
    }

    fn owned(&self, unit_id: UnitId, id: RecordId) -> Result<Option<usize>, LedgerStoreError> {
        match self.owners.get(&id) {
            None => Ok(None),
            Some(owner) if *owner != unit_id => Err(LedgerStoreError::TenantIsolation(format!(
                "record {id} belongs to another unit"
            ))),
            Some(_) => Ok(self
                .units
                .get(&unit_id)
                .and_then(|records| records.iter().position(|r| r.id() == id))),
        }
    }
}

/// In-memory append-only ledger, the offline (local storage) mode.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

fn poisoned<T>(_: T) -> LedgerStoreError {
    LedgerStoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize every unit's ledger as JSON, in insertion order.
    pub fn export_snapshot(&self) -> Result<String, LedgerStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut all: Vec<&LedgerRecord> = inner.units.values().flatten().collect();
        all.sort_by_key(|r| (r.unit_id(), r.sequence()));
        serde_json::to_string(&all).map_err(|e| LedgerStoreError::Unavailable(format!("snapshot encode: {e}")))
    }

    /// Rebuild from [`export_snapshot`](Self::export_snapshot) output.
    ///
    /// Sequence numbers and sync flags are kept as saved.
    pub fn from_snapshot(json: &str) -> Result<Self, LedgerStoreError> {
        let mut saved: Vec<LedgerRecord> =
            serde_json::from_str(json).map_err(|e| LedgerStoreError::Unavailable(format!("snapshot decode: {e}")))?;
        saved.sort_by_key(|r| (r.unit_id(), r.sequence()));

        let mut inner = Inner::default();
        for record in saved {
            let expected = inner.units.get(&record.unit_id()).map_or(0, Vec::len) as u64 + 1;
            if record.sequence() != expected {
                return Err(LedgerStoreError::Unavailable(format!(
                    "snapshot sequence gap in unit {}: expected {expected}, found {}",
                    record.unit_id(),
                    record.sequence()
                )));
            }
            inner.insert(record)?;
        }

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, record: UncommittedRecord) -> Result<LedgerRecord, LedgerStoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        let sequence = inner.units.get(&record.unit_id).map_or(0, Vec::len) as u64 + 1;
        let stored = LedgerRecord::new(
            record.id.unwrap_or_default(),
            record.unit_id,
            sequence,
            record.recorded_at_millis.unwrap_or_else(|| Utc::now().timestamp_millis()),
            record.recorded_by,
            SyncState::Pending,
            record.entry,
        );

        inner.insert(stored.clone())?;
        Ok(stored)
    }

    fn get(&self, unit_id: UnitId, id: RecordId) -> Result<Option<LedgerRecord>, LedgerStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let position = inner.owned(unit_id, id)?;
        Ok(position.and_then(|idx| inner.units.get(&unit_id).map(|records| records[idx].clone())))
    }

    fn query(&self, query: &LedgerQuery) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .units
            .get(&query.unit_id)
            .map(|records| query.apply(records.iter()))
            .unwrap_or_default())
    }

    fn pending(&self, unit_id: UnitId) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .units
            .get(&unit_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.sync_state() == SyncState::Pending)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn mark_synced(&self, unit_id: UnitId, ids: &[RecordId]) -> Result<usize, LedgerStoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        let mut positions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(idx) = inner.owned(unit_id, *id)? {
                positions.push(idx);
            }
        }

        let Some(records) = inner.units.get_mut(&unit_id) else {
            return Ok(0);
        };
        let mut changed = 0;
        for idx in positions {
            if records[idx].sync_state() == SyncState::Pending {
                records[idx] = records[idx].with_sync_state(SyncState::Synced);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
