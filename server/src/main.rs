mod api;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use musewave::config::load_config_or_default;
use musewave::logging::init_logging;
use musewave::records::open_record_store;
use musewave::{
    AssetLayout, EngineSet, InMemoryJobStore, JobStore, JobSupervisor, JobSweeper, Orchestrator,
    ProcessRunner,
};

use state::AppState;

/// How long shutdown waits for running jobs before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("MUSEWAVE_CONFIG").map(PathBuf::from))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_default(config_path())?;
    init_logging(&config.logging)?;

    info!("Starting MuseWave server v{}", env!("CARGO_PKG_VERSION"));

    let engines = Arc::new(EngineSet::new(Arc::new(ProcessRunner::new()), &config.engines));
    let detected = engines.detect().await;
    info!(
        "Engine detection finished: {} of {} capabilities available",
        detected.capabilities.values().filter(|v| **v).count(),
        detected.capabilities.len()
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new(config.jobs.retention()));
    let records = open_record_store(&config.records)?;
    let supervisor = Arc::new(JobSupervisor::new(config.jobs.max_concurrent_jobs));

    let sweeper = JobSweeper::new(Arc::clone(&store), config.jobs.sweep_interval());
    let sweeper_handle = sweeper.start();

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        records,
        Arc::clone(&engines),
        AssetLayout::from_config(&config),
        Arc::clone(&supervisor),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let router = api::create_router(AppState::new(orchestrator, engines))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("API server shutting down...");
        })
        .await?;

    sweeper.stop();
    if let Err(e) = sweeper_handle.await {
        log::warn!("Sweeper task ended abnormally: {}", e);
    }

    let joined = supervisor.shutdown(SHUTDOWN_GRACE).await;
    info!("Shutdown complete, {} job(s) finished during grace period", joined);

    Ok(())
}
