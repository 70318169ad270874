use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codec_avro::{BUNDLED_SCHEMA, EncoderPool, SensorSchema, WireFraming};
use publisher::{MemoryTransport, Publisher};
use relay_api::{
    Channel, Delivery, DeliveryHandler, EncodingError, PublishOutcome, Rejection, SendFuture,
    SensorRecord, Transport, TransportError,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

// ═══════════════════════════════════════════════════════════════
//  Fixtures
// ═══════════════════════════════════════════════════════════════

struct ChannelHandler {
    completed: mpsc::UnboundedSender<PublishOutcome>,
    rejected: Mutex<Vec<(String, String, Rejection)>>,
}

impl DeliveryHandler for ChannelHandler {
    fn on_complete(&self, outcome: &PublishOutcome) {
        let _ = self.completed.send(outcome.clone());
    }

    fn on_rejected(&self, destination: &str, user_id: &str, rejection: &Rejection) {
        self.rejected
            .lock()
            .unwrap()
            .push((destination.to_string(), user_id.to_string(), rejection.clone()));
    }
}

fn encoders() -> EncoderPool {
    let schema = Arc::new(SensorSchema::parse(BUNDLED_SCHEMA).unwrap());
    EncoderPool::new(schema, WireFraming::Plain, 4)
}

fn setup(
    transport: Arc<dyn Transport>,
) -> (Publisher, Arc<ChannelHandler>, mpsc::UnboundedReceiver<PublishOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = Arc::new(ChannelHandler {
        completed: tx,
        rejected: Mutex::new(Vec::new()),
    });
    let publisher = Publisher::new(encoders(), transport, handler.clone(), Handle::current());
    (publisher, handler, rx)
}

fn heart_rate(user_id: &str, timestamp: i64) -> SensorRecord {
    let mut record = SensorRecord::new(user_id, timestamp);
    record.value.hr = Some(Channel::new(1, vec![72.0]));
    record
}

async fn next(rx: &mut mpsc::UnboundedReceiver<PublishOutcome>) -> PublishOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("completion within 5s")
        .expect("handler alive")
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn valid_record_is_sent_once_and_completed_once() {
    let transport = Arc::new(MemoryTransport::new(3));
    let (publisher, _handler, mut rx) = setup(transport.clone());

    publisher.publish("sensors", heart_rate("u1", 1000));

    let outcome = next(&mut rx).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.user_id(), "u1");
    assert_eq!(outcome.destination(), "sensors");
    let PublishOutcome::Success { latency_ms, .. } = outcome else { unreachable!() };
    assert!(latency_ms >= 0);

    assert!(publisher.drain(Duration::from_secs(1)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, "sensors");
    assert_eq!(sent[0].key, "u1");
    assert_eq!(publisher.encoders().decode(&sent[0].payload).unwrap(), heart_rate("u1", 1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn latency_uses_injected_clock() {
    let transport = Arc::new(MemoryTransport::new(1));
    let (publisher, _handler, mut rx) = setup(transport);
    let publisher = publisher.with_clock(|| 1_250);

    publisher.publish("sensors", heart_rate("u1", 1000));

    match next(&mut rx).await {
        PublishOutcome::Success { timestamp, completed_at, latency_ms, delivery, .. } => {
            assert_eq!(timestamp, 1000);
            assert_eq!(completed_at, 1250);
            assert_eq!(latency_ms, 250);
            assert_eq!(delivery.offset, 0);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn skewed_clock_reports_negative_latency() {
    let transport = Arc::new(MemoryTransport::new(1));
    let (publisher, _handler, mut rx) = setup(transport);
    let publisher = publisher.with_clock(|| 500);

    publisher.publish("sensors", heart_rate("u1", 1000));

    let PublishOutcome::Success { latency_ms, .. } = next(&mut rx).await else {
        panic!("expected success");
    };
    assert_eq!(latency_ms, -500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn record_without_channels_is_rejected_without_send() {
    let transport = Arc::new(MemoryTransport::new(1));
    let (publisher, handler, mut rx) = setup(transport.clone());

    publisher.publish("sensors", SensorRecord::new("u1", 1000));

    let rejected = handler.rejected.lock().unwrap().clone();
    assert_eq!(
        rejected,
        vec![(
            "sensors".to_string(),
            "u1".to_string(),
            Rejection::Encoding(EncodingError::NoReadings)
        )]
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(transport.attempts(), 0);
    assert_eq!(publisher.stats().rejected, 1);
    assert_eq!(publisher.stats().accepted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_record_is_rejected_without_panic() {
    let transport = Arc::new(MemoryTransport::new(1));
    let (publisher, handler, _rx) = setup(transport.clone());

    let mut record = heart_rate("u1", 1000);
    record.value.hr = Some(Channel::new(1, vec![f64::INFINITY]));
    publisher.publish("sensors", record);

    let rejected = handler.rejected.lock().unwrap().clone();
    assert_eq!(rejected.len(), 1);
    assert!(matches!(rejected[0].2, Rejection::Encoding(EncodingError::Field { .. })));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_destination_is_rejected() {
    let transport = Arc::new(MemoryTransport::new(1));
    let (publisher, handler, _rx) = setup(transport.clone());

    publisher.publish("", heart_rate("u1", 1000));

    let rejected = handler.rejected.lock().unwrap().clone();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].2, Rejection::EmptyDestination);
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transport_failure_is_reported_once_without_retry() {
    let transport = Arc::new(MemoryTransport::new(1));
    transport.fail_with(TransportError::Produce {
        topic: "sensors".into(),
        partition: 0,
        detail: "NOT_LEADER_OR_FOLLOWER".into(),
    });
    let (publisher, _handler, mut rx) = setup(transport.clone());

    publisher.publish("sensors", heart_rate("u1", 1000));

    match next(&mut rx).await {
        PublishOutcome::Failure { destination, user_id, cause, .. } => {
            assert_eq!(destination, "sensors");
            assert_eq!(user_id, "u1");
            assert!(matches!(cause, TransportError::Produce { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(publisher.drain(Duration::from_secs(1)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(transport.attempts(), 1);
    assert_eq!(publisher.stats().failed, 1);
}

struct PanickingTransport;

fn explode() -> Result<Delivery, TransportError> {
    panic!("client bug")
}

impl Transport for PanickingTransport {
    fn send(&self, _destination: &str, _key: &str, _payload: bytes::Bytes) -> SendFuture<'_> {
        Box::pin(async { explode() })
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_transport_still_completes_once() {
    let (publisher, _handler, mut rx) = setup(Arc::new(PanickingTransport));

    publisher.publish("sensors", heart_rate("u1", 1000));

    let PublishOutcome::Failure { cause, .. } = next(&mut rx).await else {
        panic!("expected failure");
    };
    assert!(matches!(cause, TransportError::Aborted(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_do_not_cross_talk() {
    const THREADS: usize = 8;
    const PER_THREAD: i64 = 50;

    let transport = Arc::new(MemoryTransport::new(6));
    let (publisher, _handler, mut rx) = setup(transport.clone());
    let publisher = Arc::new(publisher);

    let threads: Vec<_> = (0..THREADS)
        .map(|t| {
            let publisher = publisher.clone();
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let mut record = SensorRecord::new(format!("user-{t}"), i);
                    record.value.ecg = Some(Channel::new(700, vec![t as i32; (i % 5 + 1) as usize]));
                    publisher.publish("sensors", record);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let total = THREADS * PER_THREAD as usize;
    for _ in 0..total {
        assert!(next(&mut rx).await.is_success());
    }

    let sent = transport.sent();
    assert_eq!(sent.len(), total);
    let mut partitions: HashMap<String, i32> = HashMap::new();
    for message in &sent {
        let decoded = publisher.encoders().decode(&message.payload).unwrap();
        assert_eq!(decoded.user_id, message.key);
        let t: i32 = message.key.trim_start_matches("user-").parse().unwrap();
        let ecg = decoded.value.ecg.unwrap();
        assert!(ecg.value.iter().all(|v| *v == t));
        assert_eq!(ecg.value.len() as i64, decoded.timestamp % 5 + 1);
        let partition = partitions.entry(message.key.clone()).or_insert(message.partition);
        assert_eq!(*partition, message.partition);
    }
    assert_eq!(publisher.stats().delivered, total as u64);
    assert_eq!(publisher.stats().in_flight, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drain_times_out_while_sends_are_pending() {
    let transport = Arc::new(MemoryTransport::new(1).with_latency(Duration::from_millis(500)));
    let (publisher, _handler, _rx) = setup(transport);

    publisher.publish("sensors", heart_rate("u1", 1000));

    assert!(!publisher.drain(Duration::from_millis(20)).await);
    assert_eq!(publisher.stats().in_flight, 1);
    assert!(publisher.drain(Duration::from_secs(5)).await);
}
