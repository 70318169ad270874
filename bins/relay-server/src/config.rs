use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use codec_avro::WireFraming;
use kafka_transport::KafkaConfig;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "relay-server", about = "HTTP to Kafka relay for wearable sensor readings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay
    Serve(ServeArgs),
    /// Check config and schema, then exit
    Validate(ServeArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: String,

    /// HTTP listen address
    #[arg(long, env = "RELAY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Destination topic
    #[arg(long, env = "RELAY_TOPIC")]
    pub topic: Option<String>,

    /// Bootstrap brokers, comma separated
    #[arg(long, env = "KAFKA_BOOTSTRAP_SERVERS", value_delimiter = ',')]
    pub brokers: Option<Vec<String>>,

    /// Node id attached to delivery logs
    #[arg(long, env = "NODE_ID")]
    pub node_id: Option<String>,

    /// Path to the .avsc schema
    #[arg(long, env = "RELAY_SCHEMA")]
    pub schema: Option<PathBuf>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Glue schema registry name
    #[arg(long, env = "AWS_SCHEMA_REGISTRY")]
    pub registry_name: Option<String>,

    /// Glue schema name
    #[arg(long, env = "AWS_GLUE_SCHEMA")]
    pub schema_name: Option<String>,

    /// Glue schema version id; enables the Glue wire header
    #[arg(long, env = "AWS_GLUE_SCHEMA_VERSION_ID")]
    pub schema_version_id: Option<Uuid>,

    /// Publish to the in-process memory transport instead of Kafka
    #[arg(long)]
    pub dry_run: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub node_id: Option<String>,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub publish: PublishSection,
    #[serde(default)]
    pub schema: SchemaSection,
    pub transport: Option<TransportConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    pub listen: Option<SocketAddr>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishSection {
    pub topic: Option<String>,
    /// Idle encoders kept for reuse.
    pub encoder_pool: Option<usize>,
    pub drain_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchemaSection {
    pub path: Option<PathBuf>,
    pub registry_name: Option<String>,
    pub region: Option<String>,
    pub schema_name: Option<String>,
    pub schema_version_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    Kafka(KafkaConfig),
    Memory {
        #[serde(default = "default_memory_partitions")]
        partitions: u32,
        /// Retained messages; the oldest are dropped past this.
        #[serde(default = "default_memory_max_records")]
        max_records: usize,
    },
}

fn default_memory_partitions() -> u32 {
    1
}

fn default_memory_max_records() -> usize {
    publisher::DEFAULT_MAX_RECORDS
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

const DEFAULT_TOPIC: &str = "sensor-data";
const DEFAULT_SCHEMA_PATH: &str = "schemas/SensorRecord.avsc";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_ENCODER_POOL: usize = 16;
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            context: "read",
            detail: format!("'{path}': {e}"),
        })?;
        Self::parse(&content).map_err(|e| match e {
            ServerError::Config { context, detail } => ServerError::Config {
                context,
                detail: format!("'{path}': {detail}"),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ServerError> {
        toml::from_str(content).map_err(|e| ServerError::Config {
            context: "parse",
            detail: e.to_string(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Schema file plus the registry identity it is published under.
#[derive(Debug, Clone)]
pub struct SchemaSettings {
    pub path: PathBuf,
    pub registry_name: Option<String>,
    pub region: Option<String>,
    pub schema_name: Option<String>,
    pub schema_version_id: Option<Uuid>,
}

impl SchemaSettings {
    pub fn framing(&self) -> WireFraming {
        match self.schema_version_id {
            Some(schema_version_id) => WireFraming::Glue { schema_version_id },
            None => WireFraming::Plain,
        }
    }
}

/// Final settings after merging: config file < env/CLI.
#[derive(Debug, Clone)]
pub struct Effective {
    pub node_id: String,
    pub listen: SocketAddr,
    pub max_body_bytes: usize,
    pub topic: String,
    pub encoder_pool: usize,
    pub drain_timeout: Duration,
    pub schema: SchemaSettings,
    pub transport: TransportConfig,
}

impl Effective {
    pub fn new(args: &ServeArgs) -> Result<Self, ServerError> {
        // A missing default config file is fine; an unreadable one is not.
        let cfg = if Path::new(&args.config).exists() {
            ServerConfig::load(&args.config)?
        } else {
            tracing::debug!(config = %args.config, "config file not found, using defaults");
            ServerConfig::default()
        };
        Self::merge(args, cfg)
    }

    pub fn merge(args: &ServeArgs, cfg: ServerConfig) -> Result<Self, ServerError> {
        let topic = args
            .topic
            .clone()
            .or(cfg.publish.topic)
            .unwrap_or_else(|| DEFAULT_TOPIC.into());
        if topic.trim().is_empty() {
            return Err(ServerError::Config {
                context: "publish",
                detail: "topic must not be empty".into(),
            });
        }

        let encoder_pool = cfg.publish.encoder_pool.unwrap_or(DEFAULT_ENCODER_POOL);
        if encoder_pool == 0 {
            return Err(ServerError::Config {
                context: "publish",
                detail: "encoder_pool must be at least 1".into(),
            });
        }

        let transport = if args.dry_run {
            TransportConfig::Memory {
                partitions: default_memory_partitions(),
                max_records: default_memory_max_records(),
            }
        } else {
            match (args.brokers.clone(), cfg.transport) {
                (Some(brokers), Some(TransportConfig::Kafka(mut kafka))) => {
                    kafka.brokers = brokers;
                    TransportConfig::Kafka(kafka)
                }
                (Some(brokers), _) => TransportConfig::Kafka(KafkaConfig::new(brokers)),
                (None, Some(transport)) => transport,
                (None, None) => {
                    return Err(ServerError::Config {
                        context: "transport",
                        detail: "no [transport] configured; set KAFKA_BOOTSTRAP_SERVERS or use --dry-run".into(),
                    });
                }
            }
        };
        if let TransportConfig::Kafka(kafka) = &transport {
            if kafka.brokers.iter().all(|b| b.trim().is_empty()) {
                return Err(ServerError::Config {
                    context: "transport",
                    detail: "kafka transport needs at least one broker".into(),
                });
            }
        }

        Ok(Self {
            node_id: args
                .node_id
                .clone()
                .or(cfg.node_id)
                .unwrap_or_else(|| "relay-0".into()),
            listen: args.listen.or(cfg.http.listen).unwrap_or_else(default_listen),
            max_body_bytes: cfg.http.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            topic,
            encoder_pool,
            drain_timeout: Duration::from_millis(
                cfg.publish.drain_timeout_ms.unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS),
            ),
            schema: SchemaSettings {
                path: args
                    .schema
                    .clone()
                    .or(cfg.schema.path)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH)),
                registry_name: args.registry_name.clone().or(cfg.schema.registry_name),
                region: args.region.clone().or(cfg.schema.region),
                schema_name: args.schema_name.clone().or(cfg.schema.schema_name),
                schema_version_id: args.schema_version_id.or(cfg.schema.schema_version_id),
            },
            transport,
        })
    }
}
