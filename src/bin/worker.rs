//! Standalone ingestion worker process (spec.md §2/C7, §5 "workers run in a
//! separate pool of processes"). Spawns `worker_concurrency` Tokio tasks,
//! each polling the broker in a loop, sharing one `StoreGateway` pool and
//! one `CacheLayer`.

use std::sync::Arc;
use std::time::Duration;

use mintturf_backend::config::settings::get_config;
use mintturf_backend::ingestion::worker::IngestionWorker;
use mintturf_backend::telemetry::{get_subscriber, init_subscriber};

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("mintturf-worker".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_config().expect("failed to read configuration");
    let concurrency = settings.ingestion.worker_concurrency;

    let state = mintturf_backend::build_state(settings).await?;

    let worker = Arc::new(IngestionWorker::new(
        state.store.clone(),
        state.ingestion.broker(),
        state.ingestion.results(),
        state.cache.clone(),
        state.settings.ingestion.clone(),
        Duration::from_secs(state.settings.redis.result_ttl_secs),
    ));

    tracing::info!(concurrency, "starting mintturf-worker");

    let mut handles = Vec::with_capacity(concurrency);
    for slot in 0..concurrency {
        let worker = worker.clone();
        handles.push(tokio::spawn(async move {
            loop {
                match worker.run_once(POLL_TIMEOUT).await {
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(slot, error = %e, "worker poll failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
