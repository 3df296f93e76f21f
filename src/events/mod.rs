pub mod outbox_publisher;
pub mod producer;
pub mod types;

pub use outbox_publisher::OutboxPublisher;
pub use producer::{EventProducer, ProducerConfig};
pub use types::EventEnvelope;
