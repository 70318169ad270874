use relay_api::{DeliveryHandler, PublishOutcome, Rejection};

/// Default completion handler: one `tracing` event per outcome.
pub struct LoggingHandler {
    node_id: String,
}

impl LoggingHandler {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self { node_id: node_id.into() }
    }
}

impl DeliveryHandler for LoggingHandler {
    fn on_complete(&self, outcome: &PublishOutcome) {
        match outcome {
            PublishOutcome::Success {
                destination,
                user_id,
                timestamp,
                latency_ms,
                delivery,
                ..
            } => {
                tracing::info!(
                    node_id = %self.node_id,
                    topic = %destination,
                    user_id = %user_id,
                    created_at = *timestamp,
                    latency_ms = *latency_ms,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "[Success] record delivered"
                );
            }
            PublishOutcome::Failure {
                destination,
                user_id,
                timestamp,
                cause,
            } => {
                tracing::error!(
                    node_id = %self.node_id,
                    topic = %destination,
                    user_id = %user_id,
                    created_at = *timestamp,
                    error = %cause,
                    "produce failed"
                );
            }
        }
    }

    fn on_rejected(&self, destination: &str, user_id: &str, rejection: &Rejection) {
        tracing::warn!(
            node_id = %self.node_id,
            topic = %destination,
            user_id = %user_id,
            error = %rejection,
            "record rejected"
        );
    }
}
