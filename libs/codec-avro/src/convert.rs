use std::fmt::Write as _;

use apache_avro::Schema;
use apache_avro::schema::SchemaKind;
use apache_avro::types::Value;
use relay_api::EncodingError;
use serde_json::Value as Json;

use crate::schema::SensorSchema;

// ═══════════════════════════════════════════════════════════════
//  JSON → Avro conversion
// ═══════════════════════════════════════════════════════════════

/// Walk `json` along `node`. `path` tracks the dotted field path for
/// error reports and is left pointing at the failing field on error.
pub(crate) fn json_to_avro(
    schema: &SensorSchema,
    json: &Json,
    node: &Schema,
    path: &mut String,
) -> Result<Value, EncodingError> {
    let node = schema
        .resolve(node)
        .map_err(|detail| EncodingError::field(field_name(path), detail))?;

    match (json, node) {
        (json, Schema::Union(union)) => union_to_avro(schema, json, union.variants(), path),
        (Json::Null, Schema::Null) => Ok(Value::Null),
        (Json::Bool(b), Schema::Boolean) => Ok(Value::Boolean(*b)),
        (Json::Number(n), Schema::Int) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch(path, node, json)),
        (Json::Number(n), Schema::Long) => {
            n.as_i64().map(Value::Long).ok_or_else(|| mismatch(path, node, json))
        }
        (Json::Number(n), Schema::TimestampMillis) => n
            .as_i64()
            .map(Value::TimestampMillis)
            .ok_or_else(|| mismatch(path, node, json)),
        (Json::Number(n), Schema::Float) => n
            .as_f64()
            .map(|f| Value::Float(f as f32))
            .ok_or_else(|| mismatch(path, node, json)),
        (Json::Number(n), Schema::Double) => {
            n.as_f64().map(Value::Double).ok_or_else(|| mismatch(path, node, json))
        }
        (Json::String(s), Schema::String) => Ok(Value::String(s.clone())),
        (Json::String(s), Schema::Enum(e)) => e
            .symbols
            .iter()
            .position(|symbol| symbol == s)
            .map(|idx| Value::Enum(idx as u32, s.clone()))
            .ok_or_else(|| EncodingError::field(field_name(path), format!("unknown symbol '{s}'"))),
        (Json::Array(items), Schema::Array(array)) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let mark = path.len();
                let _ = write!(path, "[{idx}]");
                out.push(json_to_avro(schema, item, &array.items, path)?);
                path.truncate(mark);
            }
            Ok(Value::Array(out))
        }
        (Json::Object(map), Schema::Record(record)) => {
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let mark = enter(path, &field.name);
                let value = match (map.get(&field.name), &field.default) {
                    (Some(value), _) => json_to_avro(schema, value, &field.schema, path)?,
                    (None, Some(default)) => json_to_avro(schema, default, &field.schema, path)?,
                    (None, None) => {
                        return Err(EncodingError::field(path.as_str(), "required field is missing"));
                    }
                };
                path.truncate(mark);
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(fields))
        }
        (json, node) => Err(mismatch(path, node, json)),
    }
}

fn union_to_avro(
    schema: &SensorSchema,
    json: &Json,
    variants: &[Schema],
    path: &mut String,
) -> Result<Value, EncodingError> {
    if json.is_null() {
        return variants
            .iter()
            .position(|v| matches!(v, Schema::Null))
            .map(|idx| Value::Union(idx as u32, Box::new(Value::Null)))
            .ok_or_else(|| EncodingError::field(field_name(path), "value is required"));
    }

    let mut last_err = None;
    for (idx, variant) in variants.iter().enumerate() {
        if matches!(variant, Schema::Null) {
            continue;
        }
        let mark = path.len();
        match json_to_avro(schema, json, variant, path) {
            Ok(value) => return Ok(Value::Union(idx as u32, Box::new(value))),
            Err(e) => {
                path.truncate(mark);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| EncodingError::field(field_name(path), "no union branch matches")))
}

fn enter(path: &mut String, name: &str) -> usize {
    let mark = path.len();
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(name);
    mark
}

fn field_name(path: &str) -> &str {
    if path.is_empty() { "<record>" } else { path }
}

fn mismatch(path: &str, expected: &Schema, got: &Json) -> EncodingError {
    // NaN and infinities serialize to null and land here.
    let got = match got {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    EncodingError::field(
        field_name(path),
        format!("expected {:?}, got {got}", SchemaKind::from(expected)),
    )
}

// ═══════════════════════════════════════════════════════════════
//  Avro → JSON conversion
// ═══════════════════════════════════════════════════════════════

pub(crate) fn avro_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int(i) => serde_json::json!(i),
        Value::Long(l) | Value::TimestampMillis(l) => serde_json::json!(l),
        Value::Float(f) => serde_json::json!(f),
        Value::Double(d) => serde_json::json!(d),
        Value::String(s) | Value::Enum(_, s) => Json::String(s.clone()),
        Value::Union(_, inner) => avro_to_json(inner),
        Value::Array(items) => Json::Array(items.iter().map(avro_to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries.iter().map(|(k, v)| (k.clone(), avro_to_json(v))).collect(),
        ),
        Value::Record(fields) => Json::Object(
            fields.iter().map(|(k, v)| (k.clone(), avro_to_json(v))).collect(),
        ),
        Value::Uuid(u) => Json::String(u.to_string()),
        _ => Json::Null,
    }
}
