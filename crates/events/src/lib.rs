//! Events and live-listener plumbing.
//!
//! Committed ledger records and catalog refreshes are pushed to listeners
//! through an [`EventBus`]; the core itself never subscribes.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod scope;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use scope::UnitScoped;
