//! Asynchronous sensor record publishing.
//!
//! [`Publisher::publish`] encodes a record with a pooled Avro encoder,
//! spawns the transport send on the runtime and reports the result to a
//! [`relay_api::DeliveryHandler`].

mod handler;
mod memory;
mod publisher;
mod stats;

pub use handler::LoggingHandler;
pub use memory::{DEFAULT_MAX_RECORDS, MemoryTransport, SentMessage};
pub use publisher::{Clock, Publisher};
pub use stats::{PublisherStats, StatsSnapshot};
