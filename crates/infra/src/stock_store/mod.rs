//! Medicine stock store boundary.
//!
//! Stock rows are keyed by `(unit_id, code)`. Treatment debits run inside
//! [`StockStore::transaction`], which holds every touched row for the whole
//! closure and writes staged changes back only when the closure succeeds.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{StockStore, StockStoreError, StockTransaction};
