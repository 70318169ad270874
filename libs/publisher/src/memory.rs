use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use relay_api::hash::murmur2_partition;
use relay_api::{Delivery, SendFuture, Transport, TransportError};

// ═══════════════════════════════════════════════════════════════
//  MemoryTransport
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub key: String,
    pub payload: Bytes,
    pub partition: i32,
    pub offset: i64,
}

/// Messages kept when no bound is given.
pub const DEFAULT_MAX_RECORDS: usize = 100_000;

#[derive(Default)]
struct Log {
    messages: VecDeque<SentMessage>,
    next_offset: HashMap<(String, i32), i64>,
}

/// In-process transport. Keeps the most recent `max_records` accepted
/// messages, routes keys with the same partitioner as Kafka, and can be
/// switched into a failing mode. Offsets keep growing past evictions.
pub struct MemoryTransport {
    partitions: u32,
    max_records: usize,
    latency: Option<Duration>,
    log: Mutex<Log>,
    failure: Mutex<Option<TransportError>>,
    attempts: AtomicUsize,
}

impl MemoryTransport {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            max_records: DEFAULT_MAX_RECORDS,
            latency: None,
            log: Mutex::new(Log::default()),
            failure: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Keep at most `max_records` messages, dropping the oldest first.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Delay every send by `latency` before acknowledging.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every following send with `error` until [`Self::recover`].
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Retained messages, in acknowledgment order.
    pub fn sent(&self) -> Vec<SentMessage> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.messages.iter().cloned().collect()
    }

    /// Send calls received, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    fn append(&self, destination: &str, key: &str, payload: Bytes) -> Result<Delivery, TransportError> {
        if let Some(error) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(error);
        }

        let partition = murmur2_partition(key.as_bytes(), self.partitions) as i32;
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let next = log.next_offset.entry((destination.to_string(), partition)).or_insert(0);
        let offset = *next;
        *next += 1;
        if log.messages.len() >= self.max_records {
            log.messages.pop_front();
        }
        log.messages.push_back(SentMessage {
            destination: destination.to_string(),
            key: key.to_string(),
            payload,
            partition,
            offset,
        });
        Ok(Delivery { partition, offset })
    }
}

impl Transport for MemoryTransport {
    fn send(&self, destination: &str, key: &str, payload: Bytes) -> SendFuture<'_> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let destination = destination.to_string();
        let key = key.to_string();
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.append(&destination, &key, payload)
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
