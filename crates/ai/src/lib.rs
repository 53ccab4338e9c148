//! `boimedicado-ai`
//!
//! Optional advisory-text boundary.
//!
//! Not part of the domain model:
//! - It does not depend on stock or ledger types.
//! - It never mutates state.
//! - It returns advisory text, not records.

pub mod advisory;
pub mod job;
pub mod result;

pub use advisory::{
    AdvisoryGenerator, DosedMedicine, StaticAdvisor, TreatmentAdvisoryJob, TreatmentSummary, build_prompt,
};
pub use job::AiJob;
pub use result::{Advisory, AdvisoryError};
