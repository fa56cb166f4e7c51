//! Call Center Communication Pipeline
//!
//! Processes worker communication requests (calls, SMS, email, push) through
//! a per-use-case configurable list of steps.
//!
//! ## Endpoints
//!
//! - `POST /api/communications` - Submit and process a request
//! - `GET /api/communications[/:id]` - Inspect stored requests
//! - `POST /api/communications/:id/reprocess?stepName=` - Rerun from a step
//! - `/api/pipeline-config[/:useCase]` - Manage use-case step lists
//! - `GET /api/steps` - Registered steps
//! - `/api/demo/*` - Demo scenarios and live reconfiguration
//! - `GET /healthz` - Health check

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callcenter_pipeline::config::{AppState, Config};
use callcenter_pipeline::handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callcenter_pipeline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    info!("Starting communication pipeline");
    info!("Step resolution: {}", config.step_resolution);
    info!(
        "Provider: {}",
        config.provider_url.as_deref().unwrap_or("simulated")
    );
    info!("Binding to: {}", bind_addr);

    // Create shared state
    let state = AppState::new(config).context("Failed to initialise application state")?;
    info!(
        "Registered steps: {}",
        state.registry.available_step_names().join(", ")
    );

    let app = handlers::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("Server failed")?;

    Ok(())
}
