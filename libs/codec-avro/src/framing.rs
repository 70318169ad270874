use bytes::{BufMut, BytesMut};
use relay_api::EncodingError;
use uuid::Uuid;

const GLUE_HEADER_VERSION: u8 = 3;
const GLUE_COMPRESSION_NONE: u8 = 0;
const GLUE_COMPRESSION_ZLIB: u8 = 5;
const GLUE_HEADER_LEN: usize = 18;

/// Bytes written in front of every Avro datum.
///
/// `Glue` matches the AWS Glue schema registry serializer: header version
/// byte, compression byte, then the 16-byte schema version id. Consumers
/// using the Glue deserializer look the schema up by that id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFraming {
    /// Bare Avro binary datum.
    #[default]
    Plain,
    Glue { schema_version_id: Uuid },
}

impl WireFraming {
    pub fn header_len(&self) -> usize {
        match self {
            WireFraming::Plain => 0,
            WireFraming::Glue { .. } => GLUE_HEADER_LEN,
        }
    }

    pub fn write_header(&self, buf: &mut BytesMut) {
        if let WireFraming::Glue { schema_version_id } = self {
            buf.put_u8(GLUE_HEADER_VERSION);
            buf.put_u8(GLUE_COMPRESSION_NONE);
            buf.put_slice(schema_version_id.as_bytes());
        }
    }

    /// Validate and remove the header, returning the datum.
    pub fn strip<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], EncodingError> {
        let WireFraming::Glue { schema_version_id } = self else {
            return Ok(data);
        };
        if data.len() < GLUE_HEADER_LEN {
            return Err(EncodingError::Framing(format!(
                "payload of {} bytes is shorter than the header",
                data.len()
            )));
        }
        if data[0] != GLUE_HEADER_VERSION {
            return Err(EncodingError::Framing(format!("unknown header version {}", data[0])));
        }
        match data[1] {
            GLUE_COMPRESSION_NONE => {}
            GLUE_COMPRESSION_ZLIB => {
                return Err(EncodingError::Framing("zlib-compressed payloads are not supported".into()));
            }
            other => return Err(EncodingError::Framing(format!("unknown compression byte {other}"))),
        }
        if &data[2..GLUE_HEADER_LEN] != schema_version_id.as_bytes() {
            return Err(EncodingError::Framing(format!(
                "schema version mismatch: expected {schema_version_id}, got {}",
                Uuid::from_slice(&data[2..GLUE_HEADER_LEN]).unwrap_or_default()
            )));
        }
        Ok(&data[GLUE_HEADER_LEN..])
    }

    /// Value for the record's `content-type` header.
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFraming::Plain => "avro/binary",
            WireFraming::Glue { .. } => "application/vnd.aws.glue.avro",
        }
    }

    pub fn schema_version_id(&self) -> Option<Uuid> {
        match self {
            WireFraming::Plain => None,
            WireFraming::Glue { schema_version_id } => Some(*schema_version_id),
        }
    }
}
