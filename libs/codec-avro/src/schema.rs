use std::collections::HashMap;
use std::path::Path;

use apache_avro::Schema;
use apache_avro::schema::RecordSchema;
use relay_api::SchemaLoadError;

// ═══════════════════════════════════════════════════════════════
//  SensorSchema
// ═══════════════════════════════════════════════════════════════

/// The active wire schema. Parsed once at startup and shared read-only
/// (behind `Arc`) by every encoder.
#[derive(Debug)]
pub struct SensorSchema {
    schema: Schema,
    /// Named types by simple name, for resolving `Schema::Ref`.
    named: HashMap<String, Schema>,
}

impl SensorSchema {
    /// Load an `.avsc` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse schema JSON. The top level must be a record with a string
    /// `user_id` (partition key) and a long `timestamp`.
    pub fn parse(text: &str) -> Result<Self, SchemaLoadError> {
        let schema = Schema::parse_str(text).map_err(|e| SchemaLoadError::Parse(e.to_string()))?;

        let Schema::Record(record) = &schema else {
            return Err(SchemaLoadError::Shape("top-level type must be a record".into()));
        };
        require_field(record, "user_id", |s| matches!(s, Schema::String))?;
        require_field(record, "timestamp", |s| {
            matches!(s, Schema::Long | Schema::TimestampMillis)
        })?;

        let mut named = HashMap::new();
        collect_named(&schema, &mut named);

        Ok(Self { schema, named })
    }

    pub fn avro(&self) -> &Schema {
        &self.schema
    }

    /// Fully qualified record name, e.g. `dev.relay.sensor.SensorRecord`.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Schema::Record(record) => record.name.fullname(None),
            _ => String::new(),
        }
    }

    /// Top-level field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        match &self.schema {
            Schema::Record(record) => record.fields.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Follow a named reference to its definition.
    pub(crate) fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema, String> {
        match schema {
            Schema::Ref { name } => self
                .named
                .get(&name.name)
                .ok_or_else(|| format!("unresolved schema reference '{}'", name.name)),
            other => Ok(other),
        }
    }
}

fn require_field(
    record: &RecordSchema,
    name: &str,
    accepts: impl Fn(&Schema) -> bool,
) -> Result<(), SchemaLoadError> {
    match record.fields.iter().find(|f| f.name == name) {
        Some(field) if accepts(&field.schema) => Ok(()),
        Some(_) => Err(SchemaLoadError::Shape(format!("field '{name}' has an unsupported type"))),
        None => Err(SchemaLoadError::Shape(format!("field '{name}' is missing"))),
    }
}

fn collect_named(schema: &Schema, named: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(record) => {
            named.insert(record.name.name.clone(), schema.clone());
            for field in &record.fields {
                collect_named(&field.schema, named);
            }
        }
        Schema::Enum(e) => {
            named.insert(e.name.name.clone(), schema.clone());
        }
        Schema::Fixed(f) => {
            named.insert(f.name.name.clone(), schema.clone());
        }
        Schema::Array(array) => collect_named(&array.items, named),
        Schema::Union(union) => {
            for variant in union.variants() {
                collect_named(variant, named);
            }
        }
        _ => {}
    }
}
