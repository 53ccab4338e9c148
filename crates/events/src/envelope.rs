use serde::{Deserialize, Serialize};
use uuid::Uuid;

use boimedicado_core::UnitId;

/// Envelope for a message pushed to listeners, carrying unit + stream metadata.
///
/// Notes:
/// - **Multi-tenancy** is enforced here via `unit_id`; listeners must drop
///   envelopes for units they are not pinned to.
/// - `sequence_number` is monotonically increasing per `(unit_id, stream)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    unit_id: UnitId,

    /// Logical stream, e.g. `"ledger"` or `"catalog"`.
    stream: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        unit_id: UnitId,
        stream: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            unit_id,
            stream: stream.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
