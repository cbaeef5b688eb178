//! Enfor API Server
//!
//! Pass `--memory` (or set `ENFOR_MEMORY_STORE=true`) to run against an
//! in-memory store instead of PostgreSQL.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use enfor_api::{auth::PasswordConfig, create_router, state::AppState};
use enfor_core::{AppConfig, LoggingConfig, MemoryStore, PgStore, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "enfor-api")]
#[command(about = "Enfor brokerage REST API server")]
#[command(version)]
struct Args {
    /// Keep all data in memory; nothing survives a restart
    #[arg(long, env = "ENFOR_MEMORY_STORE")]
    memory: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "enfor_api=debug,enfor_core={},tower_http=debug,audit=info",
            logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match std::env::var("ENFOR_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;

    init_tracing(&config.logging);

    if config.jwt.uses_dev_secret() {
        tracing::warn!("JWT_SECRET is not set; using the development secret");
    }

    let store: Arc<dyn Storage> = if args.memory {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgStore::connect(&config.database)
            .await
            .context("connecting to PostgreSQL")?;
        store.migrate().await.context("running migrations")?;
        Arc::new(store)
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, store, PasswordConfig::default())?);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Enfor API server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
