use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use boimedicado_core::{AggregateRoot, ExpectedVersion, UnitId, aggregate::execute};
use boimedicado_pharmacy::{MedicineCode, MedicineStock, StockCommand};

use super::r#trait::{StockStore, StockStoreError, StockTransaction};

type Row = Arc<Mutex<MedicineStock>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowKey {
    unit_id: UnitId,
    code: MedicineCode,
}

/// In-memory stock store with one mutex per medicine row.
///
/// The outer map lock is only held to find or insert rows; check-and-debit
/// happens under the row mutexes, taken in code order so overlapping
/// transactions cannot deadlock.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    rows: RwLock<HashMap<RowKey, Row>>,
}

fn poisoned<T>(_: T) -> StockStoreError {
    StockStoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, unit_id: UnitId, code: &MedicineCode) -> Result<Row, StockStoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        rows.get(&RowKey {
            unit_id,
            code: code.clone(),
        })
        .cloned()
        .ok_or_else(|| StockStoreError::NotFound(code.clone()))
    }

    /// Create under the map write lock. A new row is inserted only once the
    /// command succeeded, so a rejected create leaves nothing behind.
    fn create(
        &self,
        unit_id: UnitId,
        code: MedicineCode,
        command: &StockCommand,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, StockStoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let key = RowKey { unit_id, code };
        if let Some(row) = rows.get(&key).cloned() {
            drop(rows);
            let mut stock = row.lock().map_err(poisoned)?;
            return apply(&mut stock, command, expected);
        }

        let mut fresh = MedicineStock::empty(key.code.clone());
        let created = apply(&mut fresh, command, expected)?;
        rows.insert(key, Arc::new(Mutex::new(fresh)));
        Ok(created)
    }

    /// Serialize every row (all units) as JSON for offline persistence.
    pub fn export_snapshot(&self) -> Result<String, StockStoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows.values() {
            let row = row.lock().map_err(poisoned)?;
            if row.is_created() {
                out.push(row.clone());
            }
        }
        out.sort_by(|a, b| (a.unit_id(), a.code()).cmp(&(b.unit_id(), b.code())));
        serde_json::to_string(&out).map_err(|e| StockStoreError::Unavailable(format!("snapshot encode: {e}")))
    }

    /// Rebuild a store from [`export_snapshot`](Self::export_snapshot) output.
    pub fn from_snapshot(json: &str) -> Result<Self, StockStoreError> {
        let saved: Vec<MedicineStock> =
            serde_json::from_str(json).map_err(|e| StockStoreError::Unavailable(format!("snapshot decode: {e}")))?;

        let mut rows = HashMap::with_capacity(saved.len());
        for stock in saved {
            let unit_id = stock.unit_id().ok_or_else(|| {
                StockStoreError::Unavailable(format!("snapshot row {} has no unit", stock.code()))
            })?;
            let key = RowKey {
                unit_id,
                code: stock.code().clone(),
            };
            if rows.insert(key, Arc::new(Mutex::new(stock))).is_some() {
                return Err(StockStoreError::Unavailable("snapshot contains duplicate rows".to_string()));
            }
        }

        Ok(Self {
            rows: RwLock::new(rows),
        })
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, unit_id: UnitId, code: &MedicineCode) -> Result<MedicineStock, StockStoreError> {
        let row = self.row(unit_id, code)?;
        let stock = row.lock().map_err(poisoned)?;
        if !stock.is_created() {
            return Err(StockStoreError::NotFound(code.clone()));
        }
        Ok(stock.clone())
    }

    fn list(&self, unit_id: UnitId) -> Result<Vec<MedicineStock>, StockStoreError> {
        let handles: Vec<Row> = {
            let rows = self.rows.read().map_err(poisoned)?;
            rows.iter()
                .filter(|(key, _)| key.unit_id == unit_id)
                .map(|(_, row)| Arc::clone(row))
                .collect()
        };

        let mut out = Vec::with_capacity(handles.len());
        for row in handles {
            let stock = row.lock().map_err(poisoned)?;
            if stock.is_created() {
                out.push(stock.clone());
            }
        }
        out.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(out)
    }

    fn transaction<T, E, F>(&self, unit_id: UnitId, codes: &[MedicineCode], work: F) -> Result<T, E>
    where
        E: From<StockStoreError>,
        F: FnOnce(&mut StockTransaction) -> Result<T, E>,
    {
        let ordered: BTreeSet<&MedicineCode> = codes.iter().collect();

        let mut handles = Vec::with_capacity(ordered.len());
        for code in &ordered {
            handles.push(self.row(unit_id, code)?);
        }

        let mut guards: Vec<MutexGuard<'_, MedicineStock>> = Vec::with_capacity(handles.len());
        for row in &handles {
            guards.push(row.lock().map_err(poisoned)?);
        }

        let mut tx = StockTransaction::new(unit_id, guards.iter().map(|g| (**g).clone()));
        let value = work(&mut tx)?;

        let (mut staged, _events) = tx.into_parts();
        for guard in guards.iter_mut() {
            if let Some(updated) = staged.remove(guard.code()) {
                **guard = updated;
            }
        }

        Ok(value)
    }

    fn execute(
        &self,
        unit_id: UnitId,
        command: StockCommand,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, StockStoreError> {
        let row = match &command {
            StockCommand::CreateMedicine(cmd) => {
                let code = MedicineCode::from_name(&cmd.name).map_err(StockStoreError::Domain)?;
                return self.create(unit_id, code, &command, expected);
            }
            StockCommand::Restock(cmd) => self.row(unit_id, &cmd.code)?,
            StockCommand::Debit(cmd) => self.row(unit_id, &cmd.code)?,
            StockCommand::Rename(cmd) => self.row(unit_id, &cmd.code)?,
            StockCommand::Reprice(cmd) => self.row(unit_id, &cmd.code)?,
            StockCommand::Retire(cmd) => self.row(unit_id, &cmd.code)?,
        };

        let mut stock = row.lock().map_err(poisoned)?;
        apply(&mut stock, &command, expected)
    }
}

/// Version check, then run `command` on a staged copy; `stock` changes only
/// on success.
fn apply(
    stock: &mut MedicineStock,
    command: &StockCommand,
    expected: ExpectedVersion,
) -> Result<MedicineStock, StockStoreError> {
    expected.check(stock.version()).map_err(StockStoreError::Domain)?;

    let mut staged = stock.clone();
    let code = staged.code().clone();
    execute(&mut staged, command).map_err(|e| StockStoreError::from_stock(&code, e))?;
    *stock = staged.clone();
    Ok(staged)
}
