//! Flowbot server entry point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use flowbot_config::{load_settings, RuntimeEnvironment, Settings};
use flowbot_core::NluOracle;
use flowbot_server::{create_router, init_metrics, AppState, Engine, HttpNluOracle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("FLOWBOT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("Warning: Failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting flowbot server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let metrics_handle = init_metrics()?;
    tracing::info!("Initialized Prometheus metrics at /metrics");

    if config.persistence.enabled {
        if let Some(parent) = Path::new(&config.persistence.db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let nlu: Arc<dyn NluOracle> = Arc::new(HttpNluOracle::new(&config.nlu)?);
    let engine = Engine::build(&config, nlu)?;
    let state = AppState::new(config.clone(), engine, Some(metrics_handle), env);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}

fn init_tracing(config: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if matches!(config.environment, RuntimeEnvironment::Production) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
