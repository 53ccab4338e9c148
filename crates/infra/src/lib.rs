//! Infrastructure layer: stores, coordinator, catalog and unit directory,
//! reporting and configuration.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod ledger_store;
pub mod reporting;
pub mod stock_store;
pub mod units;

pub use catalog::{CatalogError, CatalogSource, InMemoryCatalog};
pub use config::LedgerConfig;
pub use coordinator::{CommitError, CommitErrorKind, TreatmentCoordinator};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError, PublishingLedgerStore};
pub use reporting::{DashboardFilter, DashboardSummary};
pub use stock_store::{InMemoryStockStore, StockStore, StockStoreError};
pub use units::{InMemoryUnitDirectory, UnitDirectory, UnitDirectoryError};
