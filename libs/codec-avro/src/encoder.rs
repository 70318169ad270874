use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use crossbeam_channel::{Receiver, Sender};
use relay_api::{EncodingError, SensorRecord};

use crate::convert::{avro_to_json, json_to_avro};
use crate::framing::WireFraming;
use crate::schema::SensorSchema;

// ═══════════════════════════════════════════════════════════════
//  RecordEncoder
// ═══════════════════════════════════════════════════════════════

/// Converts records to framed Avro. Holds mutable scratch state, so one
/// instance must never be used by two threads at once; share an
/// [`EncoderPool`] instead.
pub struct RecordEncoder {
    schema: Arc<SensorSchema>,
    framing: WireFraming,
    path: String,
    buf: BytesMut,
}

impl RecordEncoder {
    pub fn new(schema: Arc<SensorSchema>, framing: WireFraming) -> Self {
        Self {
            schema,
            framing,
            path: String::new(),
            buf: BytesMut::with_capacity(1024),
        }
    }

    pub fn encode(&mut self, record: &SensorRecord) -> Result<Bytes, EncodingError> {
        if record.user_id.is_empty() {
            return Err(EncodingError::EmptyUserId);
        }
        if record.value.is_empty() {
            return Err(EncodingError::NoReadings);
        }

        let json = serde_json::to_value(record)
            .map_err(|e| EncodingError::field("<record>", e.to_string()))?;
        self.path.clear();
        let value = json_to_avro(&self.schema, &json, self.schema.avro(), &mut self.path)?;
        let datum = apache_avro::to_avro_datum(self.schema.avro(), value)
            .map_err(|e| EncodingError::Avro(e.to_string()))?;

        self.buf.clear();
        self.buf.reserve(self.framing.header_len() + datum.len());
        self.framing.write_header(&mut self.buf);
        self.buf.extend_from_slice(&datum);
        Ok(self.buf.split().freeze())
    }
}

/// Decode one framed payload back into a record.
pub fn decode(
    schema: &SensorSchema,
    framing: &WireFraming,
    data: &[u8],
) -> Result<SensorRecord, EncodingError> {
    let mut datum = framing.strip(data)?;
    let value = apache_avro::from_avro_datum(schema.avro(), &mut datum, None)
        .map_err(|e| EncodingError::Decode(e.to_string()))?;
    serde_json::from_value(avro_to_json(&value)).map_err(|e| EncodingError::Decode(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════
//  EncoderPool
// ═══════════════════════════════════════════════════════════════

/// Idle encoders shared by all publishing threads. A checkout takes an
/// idle encoder or builds a new one; the guard returns it on drop, so
/// each encoder is only ever touched by one thread at a time.
pub struct EncoderPool {
    schema: Arc<SensorSchema>,
    framing: WireFraming,
    idle_tx: Sender<RecordEncoder>,
    idle_rx: Receiver<RecordEncoder>,
    created: AtomicUsize,
}

impl EncoderPool {
    /// `capacity` bounds the number of idle encoders kept; extra ones are
    /// dropped when returned.
    pub fn new(schema: Arc<SensorSchema>, framing: WireFraming, capacity: usize) -> Self {
        let (idle_tx, idle_rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            schema,
            framing,
            idle_tx,
            idle_rx,
            created: AtomicUsize::new(0),
        }
    }

    pub fn checkout(&self) -> PooledEncoder<'_> {
        let encoder = self.idle_rx.try_recv().unwrap_or_else(|_| {
            self.created.fetch_add(1, Ordering::Relaxed);
            RecordEncoder::new(self.schema.clone(), self.framing)
        });
        PooledEncoder { encoder: Some(encoder), pool: self }
    }

    pub fn encode(&self, record: &SensorRecord) -> Result<Bytes, EncodingError> {
        self.checkout().encode(record)
    }

    pub fn decode(&self, data: &[u8]) -> Result<SensorRecord, EncodingError> {
        decode(&self.schema, &self.framing, data)
    }

    pub fn schema(&self) -> &SensorSchema {
        &self.schema
    }

    pub fn framing(&self) -> WireFraming {
        self.framing
    }

    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    /// Encoders built since the pool was created.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for EncoderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderPool")
            .field("schema", &self.schema.full_name())
            .field("framing", &self.framing)
            .field("idle", &self.idle())
            .field("created", &self.created())
            .finish_non_exhaustive()
    }
}

pub struct PooledEncoder<'a> {
    encoder: Option<RecordEncoder>,
    pool: &'a EncoderPool,
}

impl PooledEncoder<'_> {
    pub fn encode(&mut self, record: &SensorRecord) -> Result<Bytes, EncodingError> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.encode(record),
            None => Err(EncodingError::Avro("encoder already returned to pool".into())),
        }
    }
}

impl Drop for PooledEncoder<'_> {
    fn drop(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            let _ = self.pool.idle_tx.try_send(encoder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BUNDLED_SCHEMA;
    use relay_api::{Axis, Channel};
    use uuid::Uuid;

    fn pool(framing: WireFraming) -> EncoderPool {
        let schema = Arc::new(SensorSchema::parse(BUNDLED_SCHEMA).unwrap());
        EncoderPool::new(schema, framing, 8)
    }

    fn full_record() -> SensorRecord {
        let mut record = SensorRecord::new("user-42", 1_700_000_000_000);
        record.connection_id = Some("c0ffee".into());
        record.segment_size = Some(1000);
        record.value.acc = Some(Channel::new(
            32,
            vec![Axis { x: 0.5, y: -0.25, z: 9.81 }, Axis { x: 0.0, y: 0.0, z: 1.0 }],
        ));
        record.value.ecg = Some(Channel::new(700, vec![-12, 0, 512]));
        record.value.emg = Some(Channel::new(700, vec![3, 4]));
        record.value.bvp = Some(Channel::new(64, vec![1.5, -2.5]));
        record.value.hr = Some(Channel::new(1, vec![72.0]));
        record.value.temp = Some(Channel::new(4, vec![36.6, 36.7]));
        record
    }

    #[test]
    fn debug_shows_schema_and_counters() {
        let pool = pool(WireFraming::Plain);
        pool.encode(&full_record()).unwrap();
        let shown = format!("{pool:?}");
        assert!(shown.contains("dev.relay.sensor.SensorRecord"), "{shown}");
        assert!(shown.contains("created: 1"), "{shown}");
    }

    #[test]
    fn every_channel_survives_decode() {
        let pool = pool(WireFraming::Plain);
        let record = full_record();
        let bytes = pool.encode(&record).unwrap();
        assert_eq!(pool.decode(&bytes).unwrap(), record);
    }

    #[test]
    fn single_channel_record_decodes_with_other_channels_absent() {
        let pool = pool(WireFraming::Plain);
        let mut record = SensorRecord::new("u1", 1000);
        record.value.hr = Some(Channel::new(1, vec![72.0]));

        let decoded = pool.decode(&pool.encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.user_id, "u1");
        assert_eq!(decoded.timestamp, 1000);
        assert_eq!(decoded.value.hr, Some(Channel::new(1, vec![72.0])));
        assert_eq!(decoded.value.channel_count(), 1);
    }

    #[test]
    fn glue_framing_prefixes_header() {
        let id = Uuid::from_u128(7);
        let pool = pool(WireFraming::Glue { schema_version_id: id });
        let record = full_record();
        let bytes = pool.encode(&record).unwrap();
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[2..18], id.as_bytes());
        assert_eq!(pool.decode(&bytes).unwrap(), record);
    }

    #[test]
    fn record_without_readings_is_rejected() {
        let pool = pool(WireFraming::Plain);
        let err = pool.encode(&SensorRecord::new("u1", 1000)).unwrap_err();
        assert_eq!(err, EncodingError::NoReadings);
    }

    #[test]
    fn empty_user_id_is_rejected() {
        let pool = pool(WireFraming::Plain);
        let mut record = full_record();
        record.user_id.clear();
        assert_eq!(pool.encode(&record).unwrap_err(), EncodingError::EmptyUserId);
    }

    #[test]
    fn nan_sample_is_rejected() {
        let pool = pool(WireFraming::Plain);
        let mut record = SensorRecord::new("u1", 1000);
        record.value.temp = Some(Channel::new(4, vec![f64::NAN]));
        assert!(matches!(pool.encode(&record), Err(EncodingError::Field { .. })));
    }

    #[test]
    fn truncated_payload_fails_to_decode() {
        let pool = pool(WireFraming::Plain);
        let bytes = pool.encode(&full_record()).unwrap();
        let err = pool.decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, EncodingError::Decode(_)));
    }

    #[test]
    fn sequential_checkouts_reuse_one_encoder() {
        let pool = pool(WireFraming::Plain);
        let record = full_record();
        for _ in 0..10 {
            pool.encode(&record).unwrap();
        }
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn concurrent_checkouts_get_distinct_encoders() {
        let pool = pool(WireFraming::Plain);
        let first = pool.checkout();
        let second = pool.checkout();
        assert_eq!(pool.created(), 2);
        drop(first);
        drop(second);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn parallel_encoding_has_no_cross_talk() {
        let pool = Arc::new(pool(WireFraming::Plain));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let mut record = SensorRecord::new(format!("user-{t}"), i);
                        record.value.ecg = Some(Channel::new(700, vec![t as i32, i as i32]));
                        let decoded = pool.decode(&pool.encode(&record).unwrap()).unwrap();
                        assert_eq!(decoded, record);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.created() <= 8);
    }
}
