mod config;
mod errors;
mod export;
mod llm_client;
mod models;
mod persistence;
mod planning;
mod proxy;
mod render;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::CompletionClient;
use crate::persistence::{BackendClient, FallbackStore, JsonFileStore, PersistenceAdapter, RedisStore};
use crate::proxy::BackendProxy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SmartStart API v{}", env!("CARGO_PKG_VERSION"));

    // Completion gateway
    let completion = CompletionClient::new(
        config.completion_api_url.clone(),
        config.completion_api_key.clone(),
        config.completion_model.clone(),
        config.completion_timeout,
    )?;
    info!("Completion client initialized (model: {})", completion.model());

    // Fallback list: Redis when configured, otherwise a JSON file
    let store: Arc<dyn FallbackStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Fallback plans stored in Redis");
            Arc::new(RedisStore::new(client))
        }
        None => {
            info!(
                "Fallback plans stored in {}",
                config.fallback_store_path.display()
            );
            Arc::new(JsonFileStore::new(config.fallback_store_path.clone()))
        }
    };

    let http = reqwest::Client::new();
    let backend = BackendClient::new(http.clone(), &config.backend_api_url, config.persist_timeout);
    info!(
        "Backend API at {} (save timeout {:?})",
        config.backend_api_url, config.persist_timeout
    );

    // Build app state
    let state = AppState {
        completion: Arc::new(completion),
        persistence: PersistenceAdapter::new(backend, store),
        proxy: BackendProxy::new(http, &config.backend_api_url),
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
