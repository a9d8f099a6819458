use debtor_desk::config::get_configuration;
use debtor_desk::startup::{build_router, spawn_idle_view_sweeper};
use debtor_desk::AppState;
use desk_core::observability::init_tracing;
use dotenvy::dotenv;
use std::time::Duration;
use tracing::info;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "debtor-desk",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    debtor_desk::services::metrics::init_metrics();

    let state = AppState::from_settings(&configuration);
    spawn_idle_view_sweeper(state.views.clone(), SWEEP_INTERVAL);

    info!(
        backend = %state.backend.base_url(),
        "Debtor documents backend configured"
    );

    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting debtor-desk on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
