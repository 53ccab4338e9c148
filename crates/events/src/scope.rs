use boimedicado_core::UnitId;

use crate::EventEnvelope;

/// Messages that belong to exactly one farm unit.
///
/// Listeners pinned to a unit use this to reject foreign envelopes before
/// touching any state.
pub trait UnitScoped {
    fn unit_id(&self) -> UnitId;

    fn belongs_to(&self, unit_id: UnitId) -> bool {
        self.unit_id() == unit_id
    }
}

impl<E> UnitScoped for EventEnvelope<E> {
    fn unit_id(&self) -> UnitId {
        EventEnvelope::unit_id(self)
    }
}
