//! Domain events and the envelopes they are journaled in.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
