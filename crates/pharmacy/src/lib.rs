//! Pharmacy domain module: medicine stock kept per farm unit.
//!
//! Business rules only (no IO, no storage). Quantities are millilitres; a
//! medicine's on-hand quantity can never go below zero.

pub mod code;
pub mod stock;

pub use code::{MedicineCode, Millilitres, QUANTITY_EPSILON};
pub use stock::{
    CreateMedicine, Debit, MedicineCreated, MedicineRenamed, MedicineRepriced, MedicineRetired,
    MedicineStock, Rename, Reprice, Restock, Restocked, Retire, StockCommand, StockDebited,
    StockError, StockEvent,
};
