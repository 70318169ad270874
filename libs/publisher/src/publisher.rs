use std::sync::Arc;
use std::time::Duration;

use codec_avro::EncoderPool;
use relay_api::{
    DeliveryHandler, PublishOutcome, Rejection, SensorRecord, Transport, TransportError,
    latency_ms, now_ms,
};
use tokio::runtime::Handle;

use crate::stats::{PublisherStats, StatsSnapshot};

/// Source of the completion time, Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

// ═══════════════════════════════════════════════════════════════
//  Publisher
// ═══════════════════════════════════════════════════════════════

/// Encodes records and hands them to the transport without waiting for
/// the broker. Every accepted record gets exactly one
/// [`DeliveryHandler::on_complete`] call; every dropped record gets one
/// [`DeliveryHandler::on_rejected`] call.
pub struct Publisher {
    encoders: EncoderPool,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn DeliveryHandler>,
    runtime: Handle,
    clock: Clock,
    stats: Arc<PublisherStats>,
}

impl Publisher {
    /// Sends and completion callbacks run on `runtime`.
    pub fn new(
        encoders: EncoderPool,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn DeliveryHandler>,
        runtime: Handle,
    ) -> Self {
        Self {
            encoders,
            transport,
            handler,
            runtime,
            clock: Arc::new(now_ms),
            stats: Arc::new(PublisherStats::default()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Encode `record` and enqueue one send to `destination`, keyed by
    /// `user_id`. Returns without waiting for the send; callable from any
    /// thread.
    pub fn publish(&self, destination: &str, record: SensorRecord) {
        if destination.is_empty() {
            self.reject(destination, &record.user_id, Rejection::EmptyDestination);
            return;
        }

        let payload = match self.encoders.encode(&record) {
            Ok(payload) => payload,
            Err(e) => {
                self.reject(destination, &record.user_id, e.into());
                return;
            }
        };

        self.stats.record_accepted();
        tracing::trace!(
            topic = %destination,
            user_id = %record.user_id,
            bytes = payload.len(),
            "send enqueued"
        );

        let transport = self.transport.clone();
        let topic = destination.to_string();
        let key = record.user_id.clone();
        let send = self
            .runtime
            .spawn(async move { transport.send(&topic, &key, payload).await });

        let handler = self.handler.clone();
        let stats = self.stats.clone();
        let clock = self.clock.clone();
        let destination = destination.to_string();
        let SensorRecord { user_id, timestamp, .. } = record;

        // Awaits the send task separately so a panicking transport still
        // yields exactly one completion.
        self.runtime.spawn(async move {
            let result = send
                .await
                .unwrap_or_else(|e| Err(TransportError::Aborted(e.to_string())));
            let outcome = match result {
                Ok(delivery) => {
                    let completed_at = clock();
                    PublishOutcome::Success {
                        destination,
                        user_id,
                        timestamp,
                        completed_at,
                        latency_ms: latency_ms(timestamp, completed_at),
                        delivery,
                    }
                }
                Err(cause) => PublishOutcome::Failure {
                    destination,
                    user_id,
                    timestamp,
                    cause,
                },
            };
            stats.record_completed(outcome.is_success());
            handler.on_complete(&outcome);
        });
    }

    fn reject(&self, destination: &str, user_id: &str, rejection: Rejection) {
        self.stats.record_rejected();
        tracing::debug!(topic = %destination, user_id = %user_id, error = %rejection, "publish rejected");
        self.handler.on_rejected(destination, user_id, &rejection);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn encoders(&self) -> &EncoderPool {
        &self.encoders
    }

    /// Wait until every enqueued send has completed, up to `timeout`.
    /// Returns `false` if sends were still in flight at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            while self.stats.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}
