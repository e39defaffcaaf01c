// ============================================================================
// Event Bus Client
// ============================================================================
//
// Producer/consumer abstraction over Kafka:
// - Producer: at-least-once publish, event type carried as a record header
//   so consumers can filter without deserializing payloads.
// - Consumer: manual offset commits; an offset is committed only after the
//   message's effect has been applied.
// - Worker loop: cooperative shutdown, bounded retry, quarantine topic for
//   messages that keep failing.
//
// ============================================================================

pub mod consumer;
pub mod metrics;
pub mod producer;
pub mod types;
pub mod worker;

pub use consumer::{Delivery, EventConsumer};
pub use producer::EventProducer;
pub use types::DomainEvent;
pub use worker::{run_consumer_loop, EventHandler};

/// Record header carrying the event type tag, out-of-band of the payload.
pub const EVENT_TYPE_HEADER: &str = "event";
