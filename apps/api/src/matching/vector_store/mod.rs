//! Vector store abstraction for CV embeddings.
//!
//! Backends: Qdrant (managed or self-hosted) and an in-memory store used when no
//! Qdrant URL is configured.

mod memory;
mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::matching::models::CvMetadata;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("collection error: {0}")]
    Collection(String),

    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("invalid payload: {0}")]
    Payload(String),
}

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq)]
pub struct CvHit {
    pub cv_id: String,
    /// Cosine similarity.
    pub score: f32,
    pub metadata: CvMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub backend: &'static str,
    pub collection: String,
    pub total_vectors: u64,
    pub dimension: usize,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection when it does not exist yet.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    async fn upsert(
        &self,
        cv_id: &str,
        vector: Vec<f32>,
        metadata: &CvMetadata,
    ) -> Result<(), VectorStoreError>;

    /// Up to `top_k` nearest CVs, best first. With `skill`, only CVs whose stored
    /// skills contain it exactly.
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        skill: Option<&str>,
    ) -> Result<Vec<CvHit>, VectorStoreError>;

    async fn fetch(&self, cv_id: &str) -> Result<Option<CvMetadata>, VectorStoreError>;

    async fn delete(&self, cv_id: &str) -> Result<(), VectorStoreError>;

    async fn describe(&self) -> Result<IndexStats, VectorStoreError>;
}
