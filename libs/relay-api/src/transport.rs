use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::TransportError;
use crate::outcome::Delivery;

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<Delivery, TransportError>> + Send + 'a>>;

/// Outbound broker client: asynchronous keyed send of one encoded record.
///
/// Implementations: `KafkaTransport` (rskafka), `MemoryTransport` (in-process).
pub trait Transport: Send + Sync {
    /// Produce `payload` to `destination`, routed by `key`.
    /// Resolves once the broker acknowledged or rejected the record.
    fn send(&self, destination: &str, key: &str, payload: Bytes) -> SendFuture<'_>;

    /// Short name for logs ("kafka", "memory").
    fn name(&self) -> &'static str;
}
