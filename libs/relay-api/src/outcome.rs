use serde::Serialize;

use crate::error::{Rejection, TransportError};

/// Broker acknowledgment of one produced record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Result of one enqueued send, handed to the completion handler exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Success {
        destination: String,
        user_id: String,
        /// Record creation time (Unix ms).
        timestamp: i64,
        /// Handler invocation time (Unix ms).
        completed_at: i64,
        /// `completed_at - timestamp`; negative under clock skew.
        latency_ms: i64,
        delivery: Delivery,
    },
    Failure {
        destination: String,
        user_id: String,
        timestamp: i64,
        cause: TransportError,
    },
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Success { .. })
    }

    pub fn user_id(&self) -> &str {
        match self {
            PublishOutcome::Success { user_id, .. } | PublishOutcome::Failure { user_id, .. } => user_id,
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            PublishOutcome::Success { destination, .. }
            | PublishOutcome::Failure { destination, .. } => destination,
        }
    }
}

/// Delivery latency in milliseconds. Skewed clocks yield a negative value,
/// which is reported as is.
pub fn latency_ms(timestamp: i64, completed_at: i64) -> i64 {
    completed_at.saturating_sub(timestamp)
}

/// Observability sink for publish results.
///
/// `on_complete` runs on a runtime worker thread, concurrently with other
/// completions and with new publishes; no ordering between records is
/// implied. `on_rejected` runs synchronously on the publishing thread.
pub trait DeliveryHandler: Send + Sync {
    fn on_complete(&self, outcome: &PublishOutcome);

    fn on_rejected(&self, destination: &str, user_id: &str, rejection: &Rejection);
}
