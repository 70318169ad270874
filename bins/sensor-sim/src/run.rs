use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_api::now_ms;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Effective;
use crate::domain::{Rng, SampleSource, SegmentGenerator, load_replay};
use crate::error::SimError;

/// Spawn one posting loop per simulated user and run until every user
/// sent `count` records or Ctrl+C.
pub async fn run(eff: &Effective) -> Result<(), SimError> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    let replay = match &eff.file {
        Some(path) => Some(Arc::new(load_replay(path)?)),
        None => None,
    };

    tracing::info!(
        url = %eff.url,
        users = eff.users,
        segment_size_ms = eff.segment_size,
        hz = eff.hz,
        samples = eff.samples_per_segment(),
        source = eff.file.as_deref().unwrap_or("synthetic"),
        "simulator starting"
    );

    let token = CancellationToken::new();
    let mut users = JoinSet::new();
    for i in 0..eff.users {
        let source = match &replay {
            Some(rows) => SampleSource::Replay { rows: rows.clone(), pos: 0 },
            None if eff.seed == 0 => SampleSource::Synthetic(Rng::from_clock()),
            None => SampleSource::Synthetic(Rng::new((eff.seed as u64).wrapping_add(i as u64))),
        };
        let generator = SegmentGenerator::new(
            uuid::Uuid::new_v4().to_string(),
            eff.hz,
            eff.segment_size,
            eff.samples_per_segment(),
            source,
        );
        users.spawn(user_loop(
            client.clone(),
            eff.url.clone(),
            generator,
            Duration::from_millis(eff.segment_size as u64),
            eff.count,
            token.clone(),
        ));
    }

    let mut sent = 0u64;
    let mut failed = 0u64;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if !token.is_cancelled() => {
                signal?;
                tracing::info!("stopping...");
                token.cancel();
            }
            joined = users.join_next() => match joined {
                Some(Ok(tally)) => {
                    sent += tally.sent;
                    failed += tally.failed;
                }
                Some(Err(e)) => tracing::error!(error = %e, "user task failed"),
                None => break,
            },
        }
    }

    tracing::info!(sent, failed, "simulator finished");
    Ok(())
}

#[derive(Debug, Default)]
struct Tally {
    sent: u64,
    failed: u64,
}

async fn user_loop(
    client: reqwest::Client,
    url: String,
    mut generator: SegmentGenerator,
    pace: Duration,
    count: u64,
    token: CancellationToken,
) -> Tally {
    let mut tally = Tally::default();
    let mut ticker = tokio::time::interval(pace);

    while count == 0 || tally.sent + tally.failed < count {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let record = generator.next_record(now_ms());
        let started = Instant::now();
        match client.post(&url).json(&record).send().await {
            Ok(resp) if resp.status().is_success() => {
                tally.sent += 1;
                tracing::info!(
                    user_id = %generator.user_id(),
                    connection_id = record.connection_id.as_deref().unwrap_or(""),
                    timestamp = record.timestamp,
                    response_ms = started.elapsed().as_millis() as u64,
                    "posted"
                );
            }
            Ok(resp) => {
                tally.failed += 1;
                tracing::warn!(user_id = %generator.user_id(), status = %resp.status(), "relay refused record");
            }
            Err(e) => {
                tally.failed += 1;
                tracing::warn!(user_id = %generator.user_id(), error = %e, "post failed");
            }
        }
    }
    tally
}
