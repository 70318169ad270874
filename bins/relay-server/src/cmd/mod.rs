pub mod serve;
pub mod validate;

use std::sync::Arc;

use codec_avro::{EncoderPool, SensorSchema};
use relay_api::{Channel, SensorRecord, now_ms};

use crate::config::Effective;
use crate::error::ServerError;

/// Load the schema, build the encoder pool and prove the pool can encode
/// a minimal record. A schema the record model cannot satisfy fails here
/// instead of on every request.
pub(crate) fn build_encoders(eff: &Effective) -> Result<EncoderPool, ServerError> {
    let schema = Arc::new(SensorSchema::load(&eff.schema.path)?);
    tracing::info!(
        path = %eff.schema.path.display(),
        schema = %schema.full_name(),
        registry = ?eff.schema.registry_name,
        region = ?eff.schema.region,
        glue_schema = ?eff.schema.schema_name,
        schema_version_id = ?eff.schema.schema_version_id,
        "loaded schema"
    );

    let encoders = EncoderPool::new(schema, eff.schema.framing(), eff.encoder_pool);

    let mut probe = SensorRecord::new("schema-probe", now_ms());
    probe.value.hr = Some(Channel::new(1, vec![60.0]));
    encoders.encode(&probe).map_err(|e| ServerError::Config {
        context: "schema",
        detail: format!("schema cannot encode a sensor record: {e}"),
    })?;

    Ok(encoders)
}
