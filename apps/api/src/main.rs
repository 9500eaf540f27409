mod config;
mod cv;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod state;

use anyhow::Result;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{DispatcherSettings, GeminiBackend, ModelDispatcher};
use crate::matching::embedding::{Embedder, HashingEmbedder, HttpEmbedder};
use crate::matching::vector_store::{MemoryStore, QdrantStore, VectorStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV screening API v{}", env!("CARGO_PKG_VERSION"));

    // Model dispatcher
    if config.google_api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set; model calls will fail over to degraded answers");
    }
    let backend = GeminiBackend::new(
        config.google_api_key.clone().unwrap_or_default(),
        config.gemini_api_base.clone(),
    )?;
    let llm = ModelDispatcher::new(
        Arc::new(backend),
        DispatcherSettings {
            primary_model: config.gemini_model.clone(),
            fallback_models: config.gemini_fallback_models.clone(),
            mock_mode: config.mock_mode,
            debug_mode: config.debug_mode,
        },
    );
    info!(
        "Model dispatcher initialized (primary: {}, {} models, mock mode: {})",
        llm.current_model(),
        llm.status_info().total_models,
        config.mock_mode
    );

    let embedder = build_embedder(&config)?;
    info!("Embedder: {}", embedder.describe());

    let vectors = build_vector_store(&config, embedder.dimension())?;
    if let Err(e) = vectors.ensure_collection().await {
        warn!("Vector collection setup failed: {e}");
    }

    let state = AppState {
        config: config.clone(),
        llm: Arc::new(llm),
        embedder,
        vectors,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP embedder when `EMBEDDING_URL` is set, otherwise (and in mock mode) the
/// local hashing embedder.
fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match &config.embedding_url {
        Some(url) if !config.mock_mode => Ok(Arc::new(HttpEmbedder::new(
            url,
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?)),
        _ => {
            warn!("Using the hashing embedder (EMBEDDING_URL unset or mock mode on)");
            Ok(Arc::new(HashingEmbedder::new(config.embedding_dimension)))
        }
    }
}

/// Qdrant when `QDRANT_URL` is set, otherwise an in-memory index.
fn build_vector_store(config: &Config, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    match &config.qdrant_url {
        Some(url) => {
            info!("Using Qdrant at {url}");
            Ok(Arc::new(QdrantStore::new(
                url,
                config.qdrant_api_key.clone(),
                config.vector_collection.clone(),
                dimension,
            )?))
        }
        None => {
            warn!("QDRANT_URL is not set; CVs are kept in memory only");
            Ok(Arc::new(MemoryStore::new(
                config.vector_collection.clone(),
                dimension,
            )))
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{o}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
