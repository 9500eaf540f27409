use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelDispatcher;
use crate::matching::embedding::Embedder;
use crate::matching::vector_store::VectorStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The only path to the generative model. Owns the failed-model set.
    pub llm: Arc<ModelDispatcher>,
    pub embedder: Arc<dyn Embedder>,
    pub vectors: Arc<dyn VectorStore>,
}
