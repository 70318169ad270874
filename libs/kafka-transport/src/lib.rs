//! Kafka implementation of [`relay_api::Transport`] on the pure Rust
//! `rskafka` client.

mod config;
mod transport;

pub use config::{Compression, KafkaConfig, SaslPlain};
pub use transport::KafkaTransport;
