pub mod api;
pub mod config;
pub mod core_state;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env()?;
    let bind = app_config.bind;
    let core = Arc::new(core_state::CoreState::from_config(app_config)?);

    let mut server = api::start_server(core, bind).await?;
    tracing::info!(addr = %server.addr, "Listening");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

    tracing::info!("Shutdown requested");
    server.shutdown();
    server.stopped().await;
    Ok(())
}
