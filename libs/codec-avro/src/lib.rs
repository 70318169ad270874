//! Avro wire encoding for sensor records.
//!
//! [`SensorSchema`] is loaded once at startup. [`EncoderPool`] hands out
//! per-thread [`RecordEncoder`]s that turn a [`relay_api::SensorRecord`]
//! into a framed Avro datum.

mod convert;
mod encoder;
mod framing;
mod schema;

pub use encoder::{EncoderPool, PooledEncoder, RecordEncoder, decode};
pub use framing::WireFraming;
pub use schema::SensorSchema;

/// The schema shipped in `schemas/SensorRecord.avsc`.
pub const BUNDLED_SCHEMA: &str = include_str!("../../../schemas/SensorRecord.avsc");
