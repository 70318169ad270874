/// Startup failure while loading the wire schema. Fatal: the relay must
/// not serve without a valid schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("read schema '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse schema: {0}")]
    Parse(String),

    #[error("unsupported schema: {0}")]
    Shape(String),
}

/// Per-record failure while converting a record to its wire form.
/// The record is dropped; nothing is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("user_id must not be empty")]
    EmptyUserId,

    #[error("record carries no sensor readings")]
    NoReadings,

    #[error("field '{field}': {detail}")]
    Field { field: String, detail: String },

    #[error("avro encode: {0}")]
    Avro(String),

    #[error("avro decode: {0}")]
    Decode(String),

    #[error("wire framing: {0}")]
    Framing(String),
}

impl EncodingError {
    pub fn field(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Field { field: field.into(), detail: detail.into() }
    }
}

/// Per-send failure reported by the transport. Surfaced through the
/// completion handler only; the core never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect: {0}")]
    Connect(String),

    #[error("topic '{topic}': {detail}")]
    Topic { topic: String, detail: String },

    #[error("produce to '{topic}' partition {partition}: {detail}")]
    Produce {
        topic: String,
        partition: i32,
        detail: String,
    },

    #[error("send aborted: {0}")]
    Aborted(String),
}

/// Why `publish` dropped a record before handing it to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("destination must not be empty")]
    EmptyDestination,

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
