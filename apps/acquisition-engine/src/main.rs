//! Acquisition Engine Binary
//!
//! Runs every pending reservation request once and prints the batch report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin acquisition-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ACQ_CONFIG`: YAML configuration path (default: config.yaml)
//! - `ACQ_REQUESTS`: JSON array of reservation requests (default: requests.json)
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`

use std::sync::Arc;

use acquisition_engine::application::ports::Settler;
use acquisition_engine::application::services::TimedSettler;
use acquisition_engine::application::use_cases::{
    ExecuteReservationUseCase, ExecutionPorts, ProcessReservationsUseCase,
};
use acquisition_engine::config::{Config, load_config};
use acquisition_engine::infrastructure::credentials::PassthroughDecryptor;
use acquisition_engine::infrastructure::persistence::{
    InMemoryReservationStore, load_requests_file,
};
use acquisition_engine::infrastructure::remote::{
    HttpSessionFactory, HttpSubmitter, HttpTimeProbe,
};
use acquisition_engine::observability::{init_metrics, init_tracing};
use anyhow::Context;
use tokio_util::sync::CancellationToken;

/// Default requests file.
const DEFAULT_REQUESTS_PATH: &str = "requests.json";

type HttpExecutor =
    ExecuteReservationUseCase<HttpSessionFactory, HttpSubmitter, HttpTimeProbe, PassthroughDecryptor>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var("ACQ_CONFIG").ok();
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    init_tracing(&config.observability.logging).context("initializing tracing")?;
    tracing::info!(
        base_url = %config.remote.base_url,
        open_time = %config.window.open_time,
        lead_days = config.window.lead_days,
        timezone = %config.window.timezone,
        "Starting acquisition engine"
    );

    if config.observability.metrics.enabled {
        init_metrics(config.observability.metrics.port).context("starting metrics exporter")?;
    }

    let executor = create_executor(&config)?;

    let requests_path =
        std::env::var("ACQ_REQUESTS").unwrap_or_else(|_| DEFAULT_REQUESTS_PATH.to_string());
    let requests = load_requests_file(&requests_path)
        .with_context(|| format!("loading requests from {requests_path}"))?;
    tracing::info!(count = requests.len(), path = %requests_path, "Requests loaded");

    let store = Arc::new(InMemoryReservationStore::with_requests(requests));
    let processor = ProcessReservationsUseCase::new(
        Arc::new(executor),
        Arc::clone(&store),
        config.retry.max_request_attempts,
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let report = processor
        .run_once(&cancel)
        .await
        .context("processing reservation requests")?;

    tracing::info!(
        processed = report.processed.len(),
        crashed = report.crashed,
        skipped = report.skipped,
        "Processing pass finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Wire the HTTP adapters into the coordinator.
fn create_executor(config: &Config) -> anyhow::Result<HttpExecutor> {
    let settler: Arc<dyn Settler> = Arc::new(TimedSettler::from_config(&config.settle));
    let ports = ExecutionPorts {
        sessions: Arc::new(HttpSessionFactory::new(config.remote.clone())),
        submitter: Arc::new(HttpSubmitter::new(&config.remote).context("building submitter")?),
        probe: Arc::new(HttpTimeProbe::new(&config.remote).context("building time probe")?),
        decryptor: Arc::new(PassthroughDecryptor),
        settler,
    };

    ExecuteReservationUseCase::from_config(ports, config).context("building executor")
}

/// Cancel in-flight executions on the first Ctrl-C.
async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupt received, cancelling in-flight executions");
            cancel.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
