use boimedicado_core::UnitId;

use crate::result::{Advisory, AdvisoryError};

/// A unit-scoped inference request.
///
/// Inputs are plain snapshots handed over by the caller; this crate stays
/// storage-agnostic.
pub trait AiJob: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    fn unit_id(&self) -> UnitId;

    fn input(&self) -> &Self::Input;

    /// Must not mutate domain state.
    fn run(&self) -> Result<Advisory, AdvisoryError>;
}
