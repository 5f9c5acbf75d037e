use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pharmacy_core::DrugId;

use crate::event::Event;

/// Envelope for an event, containing stream metadata.
///
/// This is the unit appended to an in-memory journal.
///
/// - **Append-only**: `sequence_number` increases by one per appended envelope.
/// - `payload` is the domain event itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: DrugId,
    aggregate_type: String,

    /// Position in the journal, starting at 1.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: DrugId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> DrugId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Stable type name of the wrapped event.
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
