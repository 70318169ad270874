use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use relay_api::hash::murmur2_partition;
use relay_api::{Delivery, SendFuture, Transport, TransportError};
use rskafka::client::partition::{Compression as ClientCompression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder, SaslConfig};
use rskafka::record::Record;
use tokio::sync::RwLock;

use crate::config::KafkaConfig;

// ═══════════════════════════════════════════════════════════════
//  KafkaTransport
// ═══════════════════════════════════════════════════════════════

/// Produces one record per send. Partition counts and partition clients
/// are cached per topic; a failed produce evicts both so the next send
/// re-resolves leadership.
pub struct KafkaTransport {
    client: Client,
    compression: ClientCompression,
    content_type: Option<Vec<u8>>,
    partitions: RwLock<HashMap<String, u32>>,
    clients: RwLock<HashMap<(String, i32), Arc<PartitionClient>>>,
}

impl KafkaTransport {
    pub async fn connect(config: &KafkaConfig) -> Result<Self, TransportError> {
        let mut builder = ClientBuilder::new(config.brokers.clone()).client_id(config.client_id.clone());
        if let Some(sasl) = &config.sasl {
            builder = builder.sasl_config(SaslConfig::Plain {
                username: sasl.username.clone(),
                password: sasl.password.clone(),
            });
        }

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let client = tokio::time::timeout(timeout, builder.build())
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "timed out after {}ms connecting to {:?}",
                    config.connect_timeout_ms, config.brokers
                ))
            })?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::info!(
            brokers = ?config.brokers,
            client_id = %config.client_id,
            compression = ?config.compression,
            sasl = config.sasl.is_some(),
            "kafka client connected"
        );

        Ok(Self {
            client,
            compression: config.compression.into(),
            content_type: None,
            partitions: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
        })
    }

    /// Attach a `content-type` header to every produced record.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.as_bytes().to_vec());
        self
    }

    async fn partition_count(&self, topic: &str) -> Result<u32, TransportError> {
        if let Some(count) = self.partitions.read().await.get(topic) {
            return Ok(*count);
        }

        let topics = self.client.list_topics().await.map_err(|e| TransportError::Topic {
            topic: topic.to_string(),
            detail: e.to_string(),
        })?;
        let count = topics
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.partitions.len() as u32)
            .filter(|count| *count > 0)
            .ok_or_else(|| TransportError::Topic {
                topic: topic.to_string(),
                detail: "topic does not exist".into(),
            })?;

        tracing::debug!(topic = %topic, partitions = count, "topic metadata cached");
        self.partitions.write().await.insert(topic.to_string(), count);
        Ok(count)
    }

    async fn partition_client(&self, topic: &str, partition: i32) -> Result<Arc<PartitionClient>, TransportError> {
        let key = (topic.to_string(), partition);
        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let client = self
            .client
            .partition_client(topic, partition, UnknownTopicHandling::Error)
            .await
            .map_err(|e| TransportError::Produce {
                topic: topic.to_string(),
                partition,
                detail: e.to_string(),
            })?;
        let client = Arc::new(client);
        self.clients.write().await.insert(key, client.clone());
        Ok(client)
    }

    async fn evict(&self, topic: &str, partition: i32) {
        self.partitions.write().await.remove(topic);
        self.clients.write().await.remove(&(topic.to_string(), partition));
    }

    async fn produce(&self, topic: &str, key: &str, payload: Bytes) -> Result<Delivery, TransportError> {
        let partitions = self.partition_count(topic).await?;
        let partition = murmur2_partition(key.as_bytes(), partitions) as i32;
        let client = self.partition_client(topic, partition).await?;

        let mut headers = BTreeMap::new();
        if let Some(content_type) = &self.content_type {
            headers.insert("content-type".to_string(), content_type.clone());
        }
        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(payload.to_vec()),
            headers,
            timestamp: chrono::Utc::now(),
        };

        let produced = client.produce(vec![record], self.compression).await;
        match produced {
            Ok(offsets) => {
                let offset = offsets.first().copied().ok_or_else(|| TransportError::Produce {
                    topic: topic.to_string(),
                    partition,
                    detail: "broker returned no offset".into(),
                })?;
                Ok(Delivery { partition, offset })
            }
            Err(e) => {
                self.evict(topic, partition).await;
                Err(TransportError::Produce {
                    topic: topic.to_string(),
                    partition,
                    detail: e.to_string(),
                })
            }
        }
    }
}

impl Transport for KafkaTransport {
    fn send(&self, destination: &str, key: &str, payload: Bytes) -> SendFuture<'_> {
        let topic = destination.to_string();
        let key = key.to_string();
        Box::pin(async move { self.produce(&topic, &key, payload).await })
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}
