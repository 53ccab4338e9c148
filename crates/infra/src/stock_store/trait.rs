use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use boimedicado_core::{DomainError, ExpectedVersion, UnitId, aggregate::execute};
use boimedicado_pharmacy::{
    Debit, MedicineCode, MedicineStock, Millilitres, Restock, StockCommand, StockError, StockEvent,
};

/// Stock store operation error.
///
/// `InsufficientStock` and `NotFound` carry the medicine code so callers can
/// name it back to the operator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StockStoreError {
    #[error("medicine {0} not found")]
    NotFound(MedicineCode),

    #[error("insufficient stock of {code}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        code: MedicineCode,
        requested: Millilitres,
        on_hand: Millilitres,
    },

    #[error(transparent)]
    Domain(DomainError),

    #[error("stock store unavailable: {0}")]
    Unavailable(String),
}

impl StockStoreError {
    /// Lift an aggregate error, attaching the code it concerned.
    pub fn from_stock(code: &MedicineCode, err: StockError) -> Self {
        match err {
            StockError::InsufficientStock {
                code,
                requested,
                on_hand,
            } => StockStoreError::InsufficientStock {
                code,
                requested,
                on_hand,
            },
            StockError::Domain(DomainError::NotFound) => StockStoreError::NotFound(code.clone()),
            StockError::Domain(other) => StockStoreError::Domain(other),
        }
    }
}

/// Staged view over a locked set of stock rows.
///
/// Mutations here touch private copies only. The store decides whether to
/// publish them once the transaction closure returns.
#[derive(Debug)]
pub struct StockTransaction {
    unit_id: UnitId,
    staged: BTreeMap<MedicineCode, MedicineStock>,
    events: Vec<StockEvent>,
}

impl StockTransaction {
    pub fn new(unit_id: UnitId, rows: impl IntoIterator<Item = MedicineStock>) -> Self {
        Self {
            unit_id,
            staged: rows.into_iter().map(|r| (r.code().clone(), r)).collect(),
            events: Vec::new(),
        }
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    /// Row as staged so far. Codes outside the locked set are `NotFound`.
    pub fn get(&self, code: &MedicineCode) -> Result<&MedicineStock, StockStoreError> {
        self.staged
            .get(code)
            .filter(|row| row.is_created())
            .ok_or_else(|| StockStoreError::NotFound(code.clone()))
    }

    /// Check-and-decrement on the staged row; returns the new quantity.
    ///
    /// Retired medicines count as unknown.
    pub fn debit(
        &mut self,
        code: &MedicineCode,
        amount: Millilitres,
        occurred_at: DateTime<Utc>,
    ) -> Result<Millilitres, StockStoreError> {
        let command = StockCommand::Debit(Debit {
            unit_id: self.unit_id,
            code: code.clone(),
            amount,
            occurred_at,
        });
        let row = self.live_row(code)?;
        if row.is_retired() {
            return Err(StockStoreError::NotFound(code.clone()));
        }
        let events = execute(row, &command).map_err(|e| StockStoreError::from_stock(code, e))?;
        let remaining = row.quantity_on_hand();
        self.events.extend(events);
        Ok(remaining)
    }

    pub fn restock(
        &mut self,
        code: &MedicineCode,
        amount: Millilitres,
        occurred_at: DateTime<Utc>,
    ) -> Result<Millilitres, StockStoreError> {
        let command = StockCommand::Restock(Restock {
            unit_id: self.unit_id,
            code: code.clone(),
            amount,
            occurred_at,
        });
        let row = self.live_row(code)?;
        let events = execute(row, &command).map_err(|e| StockStoreError::from_stock(code, e))?;
        let on_hand = row.quantity_on_hand();
        self.events.extend(events);
        Ok(on_hand)
    }

    /// Events emitted so far, in application order.
    pub fn events(&self) -> &[StockEvent] {
        &self.events
    }

    pub fn into_parts(self) -> (BTreeMap<MedicineCode, MedicineStock>, Vec<StockEvent>) {
        (self.staged, self.events)
    }

    fn live_row(&mut self, code: &MedicineCode) -> Result<&mut MedicineStock, StockStoreError> {
        self.staged
            .get_mut(code)
            .filter(|row| row.is_created())
            .ok_or_else(|| StockStoreError::NotFound(code.clone()))
    }
}

/// Unit-scoped medicine stock.
///
/// Implementations must:
/// - never let `quantity_on_hand` go below zero
/// - make each `transaction` all-or-nothing over its code set
/// - serialize concurrent transactions touching the same code
pub trait StockStore: Send + Sync {
    fn get(&self, unit_id: UnitId, code: &MedicineCode) -> Result<MedicineStock, StockStoreError>;

    /// Every medicine of the unit, retired ones included, ordered by code.
    fn list(&self, unit_id: UnitId) -> Result<Vec<MedicineStock>, StockStoreError>;

    /// Run `work` with `codes` locked.
    ///
    /// Staged changes become visible only if `work` returns `Ok`; on `Err`
    /// every row is left exactly as it was. Locks are held until `work`
    /// returns, so side effects inside it (a ledger append) are covered too.
    fn transaction<T, E, F>(&self, unit_id: UnitId, codes: &[MedicineCode], work: F) -> Result<T, E>
    where
        E: From<StockStoreError>,
        F: FnOnce(&mut StockTransaction) -> Result<T, E>;

    /// Administrative command on one medicine (create, restock, rename,
    /// reprice, retire), guarded by `expected` against the row version.
    fn execute(
        &self,
        unit_id: UnitId,
        command: StockCommand,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, StockStoreError>;

    /// Single-code debit.
    fn try_debit(
        &self,
        unit_id: UnitId,
        code: &MedicineCode,
        amount: Millilitres,
        occurred_at: DateTime<Utc>,
    ) -> Result<Millilitres, StockStoreError> {
        self.transaction(unit_id, std::slice::from_ref(code), |tx| {
            tx.debit(code, amount, occurred_at)
        })
    }
}

impl<S> StockStore for Arc<S>
where
    S: StockStore,
{
    fn get(&self, unit_id: UnitId, code: &MedicineCode) -> Result<MedicineStock, StockStoreError> {
        (**self).get(unit_id, code)
    }

    fn list(&self, unit_id: UnitId) -> Result<Vec<MedicineStock>, StockStoreError> {
        (**self).list(unit_id)
    }

    fn transaction<T, E, F>(&self, unit_id: UnitId, codes: &[MedicineCode], work: F) -> Result<T, E>
    where
        E: From<StockStoreError>,
        F: FnOnce(&mut StockTransaction) -> Result<T, E>,
    {
        (**self).transaction(unit_id, codes, work)
    }

    fn execute(
        &self,
        unit_id: UnitId,
        command: StockCommand,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, StockStoreError> {
        (**self).execute(unit_id, command, expected)
    }
}
