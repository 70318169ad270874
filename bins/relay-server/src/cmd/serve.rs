use std::sync::Arc;

use kafka_transport::KafkaTransport;
use publisher::{LoggingHandler, MemoryTransport, Publisher};
use relay_api::Transport;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::{Effective, ServeArgs, TransportConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("relay-server starting");

    // --- Config ---
    let eff = Effective::new(&args)?;
    tracing::info!(config = %args.config, node_id = %eff.node_id, topic = %eff.topic, "loaded config");

    // --- Schema + encoders ---
    let encoders = super::build_encoders(&eff)?;
    let framing = encoders.framing();

    // --- Transport ---
    let transport: Arc<dyn Transport> = match &eff.transport {
        TransportConfig::Kafka(kafka) => {
            Arc::new(KafkaTransport::connect(kafka).await?.with_content_type(framing.content_type()))
        }
        TransportConfig::Memory { partitions, max_records } => {
            tracing::warn!(
                partitions = *partitions,
                max_records = *max_records,
                "memory transport: records stay in this process"
            );
            Arc::new(MemoryTransport::new(*partitions).with_max_records(*max_records))
        }
    };

    // --- Publisher ---
    let handler = Arc::new(LoggingHandler::new(eff.node_id.clone()));
    let publisher = Arc::new(Publisher::new(encoders, transport, handler, Handle::current()));
    tracing::info!(transport = publisher.transport_name(), "publisher ready");

    // --- HTTP ---
    let token = CancellationToken::new();
    let app = relay_http::router(publisher.clone(), &eff.topic, eff.max_body_bytes);
    let http_token = token.clone();
    let listen = eff.listen;
    let mut http = tokio::spawn(async move { relay_http::run(listen, app, http_token).await });

    tracing::info!("server ready");

    // --- Wait for Ctrl+C, or the HTTP server dying first ---
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        served = &mut http => {
            token.cancel();
            return match served {
                Ok(result) => result.map_err(ServerError::from),
                Err(e) => Err(ServerError::Task(e.to_string())),
            };
        }
    }
    tracing::info!("shutting down...");

    // Stop accepting requests, then let enqueued sends finish.
    token.cancel();
    match http.await {
        Ok(Err(e)) => tracing::error!(error = %e, "http server error"),
        Err(e) => tracing::error!(error = %e, "http task failed"),
        Ok(Ok(())) => {}
    }

    if !publisher.drain(eff.drain_timeout).await {
        tracing::warn!(
            in_flight = publisher.stats().in_flight,
            timeout_ms = eff.drain_timeout.as_millis() as u64,
            "drain timed out, abandoning in-flight sends"
        );
    }

    let stats = publisher.stats();
    tracing::info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        delivered = stats.delivered,
        failed = stats.failed,
        "shutdown complete"
    );
    Ok(())
}
