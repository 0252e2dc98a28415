use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screener::batch::BatchController;
use screener::config::{Config, StoreBackend};
use screener::db::{create_pool, run_migrations};
use screener::llm_client::HttpModelGateway;
use screener::routes::build_router;
use screener::state::AppState;
use screener::store::{InMemoryRecordStore, PgRecordStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("screener={0},screener_api={0}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    match &config.provider {
        Some(provider) => info!(
            "LLM provider configured: {} (model: {})",
            provider.provider, provider.model
        ),
        None => warn!("LLM_PROVIDER is not set; analysis jobs will fail until it is configured"),
    }

    let controller = Arc::new(BatchController::new(
        store.clone(),
        Arc::new(HttpModelGateway),
        Arc::new(config.clone()),
    ));

    // Build app state
    let state = AppState {
        store,
        controller,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store; jobs are lost on restart");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgRecordStore::new(pool)))
        }
    }
}
