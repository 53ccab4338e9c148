//! Configuration catalog source: the latest snapshot per unit.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use boimedicado_core::UnitId;
use boimedicado_events::{EventEnvelope, Subscription, UnitScoped};
use boimedicado_ledger::CatalogSnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read side used at validation time.
///
/// Units with no snapshot yet get an empty catalog (every medicine unknown).
pub trait CatalogSource: Send + Sync {
    fn snapshot(&self, unit_id: UnitId) -> Result<Arc<CatalogSnapshot>, CatalogError>;
}

impl<S> CatalogSource for Arc<S>
where
    S: CatalogSource + ?Sized,
{
    fn snapshot(&self, unit_id: UnitId) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        (**self).snapshot(unit_id)
    }
}

/// Swappable in-memory catalog.
///
/// Readers hold an `Arc` to the snapshot they started with, so a concurrent
/// `replace` never changes what an in-flight validation sees.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    snapshots: RwLock<HashMap<UnitId, Arc<CatalogSnapshot>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `snapshot` for the unit unless a newer revision is already in
    /// place. Returns whether it was applied.
    pub fn replace(&self, unit_id: UnitId, snapshot: CatalogSnapshot) -> Result<bool, CatalogError> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        if let Some(current) = snapshots.get(&unit_id) {
            if current.revision > snapshot.revision {
                tracing::debug!(unit_id = %unit_id, current = current.revision, pushed = snapshot.revision, "stale catalog ignored");
                return Ok(false);
            }
        }
        snapshots.insert(unit_id, Arc::new(snapshot));
        Ok(true)
    }

    /// Apply every snapshot already pushed to `subscription`, without
    /// blocking. Returns how many were applied.
    pub fn follow(&self, subscription: &Subscription<EventEnvelope<CatalogSnapshot>>) -> Result<usize, CatalogError> {
        let mut applied = 0;
        for envelope in subscription.drain() {
            let unit_id = envelope.unit_id();
            if self.replace(unit_id, envelope.into_payload())? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Like [`follow`](Self::follow), but drops envelopes for other units.
    pub fn follow_unit(
        &self,
        unit_id: UnitId,
        subscription: &Subscription<EventEnvelope<CatalogSnapshot>>,
    ) -> Result<usize, CatalogError> {
        let mut applied = 0;
        for envelope in subscription.drain() {
            if !envelope.belongs_to(unit_id) {
                continue;
            }
            if self.replace(unit_id, envelope.into_payload())? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

impl CatalogSource for InMemoryCatalog {
    fn snapshot(&self, unit_id: UnitId) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;
        Ok(snapshots.get(&unit_id).cloned().unwrap_or_default())
    }
}
