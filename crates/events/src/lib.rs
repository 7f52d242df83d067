//! Domain event envelopes and the publishing boundary.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;

pub use bus::{MessagePublisher, PublishError, Subscription};
pub use envelope::EventEnvelope;
pub use in_memory_bus::InMemoryMessageBus;
