use rskafka::client::partition::Compression as ClientCompression;
use serde::Deserialize;

fn default_client_id() -> String {
    "sensor-relay".into()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Broker connection settings, the `[transport]` table when `kind = "kafka"`.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Bootstrap brokers, `host:port`.
    pub brokers: Vec<String>,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub compression: Compression,

    /// SASL PLAIN credentials. Absent means no authentication.
    #[serde(default)]
    pub sasl: Option<SaslPlain>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl KafkaConfig {
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            client_id: default_client_id(),
            compression: Compression::default(),
            sasl: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaslPlain {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Lz4,
    Snappy,
    Zstd,
}

impl From<Compression> for ClientCompression {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => ClientCompression::NoCompression,
            Compression::Gzip => ClientCompression::Gzip,
            Compression::Lz4 => ClientCompression::Lz4,
            Compression::Snappy => ClientCompression::Snappy,
            Compression::Zstd => ClientCompression::Zstd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: KafkaConfig = toml::from_str(r#"brokers = ["localhost:9092"]"#).unwrap();
        assert_eq!(cfg.brokers, vec!["localhost:9092"]);
        assert_eq!(cfg.client_id, "sensor-relay");
        assert_eq!(cfg.compression, Compression::None);
        assert!(cfg.sasl.is_none());
        assert_eq!(cfg.connect_timeout_ms, 10_000);
    }

    #[test]
    fn full_config() {
        let cfg: KafkaConfig = toml::from_str(
            r#"
            brokers = ["b1:9096", "b2:9096"]
            client_id = "relay-7"
            compression = "zstd"
            connect_timeout_ms = 2500

            [sasl]
            username = "relay"
            password = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.brokers.len(), 2);
        assert_eq!(cfg.compression, Compression::Zstd);
        assert_eq!(cfg.sasl.unwrap().username, "relay");
        assert!(matches!(ClientCompression::from(cfg.compression), ClientCompression::Zstd));
    }

    #[test]
    fn unknown_compression_is_rejected() {
        let res: Result<KafkaConfig, _> = toml::from_str(
            r#"
            brokers = ["b1:9092"]
            compression = "brotli"
            "#,
        );
        assert!(res.is_err());
    }
}
