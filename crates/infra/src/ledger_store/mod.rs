//! Append-only treatment ledger boundary.
//!
//! There is no update or delete: corrections are new entries. The only
//! store-side mutation is the sync flag, which describes the local copy and
//! not the recorded event.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError, UncommittedRecord};

use uuid::Uuid;

use boimedicado_core::{RecordId, UnitId};
use boimedicado_events::{EventBus, EventEnvelope};
use boimedicado_ledger::{LedgerQuery, LedgerRecord};

/// Stream name used for ledger envelopes on the bus.
pub const LEDGER_STREAM: &str = "ledger";

/// Adapter that publishes committed records to an `EventBus` after a
/// successful append.
///
/// Publish happens only after append succeeds. A publish failure is reported
/// as [`LedgerStoreError::Publish`] carrying the already-stored record.
pub struct PublishingLedgerStore<S, B> {
    store: S,
    bus: B,
}

impl<S, B> PublishingLedgerStore<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> LedgerStore for PublishingLedgerStore<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<LedgerRecord>>,
{
    fn append(&self, record: UncommittedRecord) -> Result<LedgerRecord, LedgerStoreError> {
        let stored = self.store.append(record)?;

        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            stored.unit_id(),
            LEDGER_STREAM,
            stored.sequence(),
            stored.clone(),
        );
        if let Err(err) = self.bus.publish(envelope) {
            return Err(LedgerStoreError::Publish {
                record: Box::new(stored),
                reason: format!("{err:?}"),
            });
        }

        Ok(stored)
    }

    fn get(&self, unit_id: UnitId, id: RecordId) -> Result<Option<LedgerRecord>, LedgerStoreError> {
        self.store.get(unit_id, id)
    }

    fn query(&self, query: &LedgerQuery) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        self.store.query(query)
    }

    fn pending(&self, unit_id: UnitId) -> Result<Vec<LedgerRecord>, LedgerStoreError> {
        self.store.pending(unit_id)
    }

    fn mark_synced(&self, unit_id: UnitId, ids: &[RecordId]) -> Result<usize, LedgerStoreError> {
        self.store.mark_synced(unit_id, ids)
    }
}
