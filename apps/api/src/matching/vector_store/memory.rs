use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CvHit, IndexStats, VectorStore, VectorStoreError};
use crate::matching::models::CvMetadata;

/// Process-local cosine store. Contents are lost on restart.
pub struct MemoryStore {
    collection: String,
    dimension: usize,
    points: RwLock<HashMap<String, (Vec<f32>, CvMetadata)>>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            points: RwLock::new(HashMap::new()),
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert(
        &self,
        cv_id: &str,
        vector: Vec<f32>,
        metadata: &CvMetadata,
    ) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::Upsert(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.points
            .write()
            .insert(cv_id.to_string(), (vector, metadata.clone()));
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        skill: Option<&str>,
    ) -> Result<Vec<CvHit>, VectorStoreError> {
        let points = self.points.read();
        let mut hits: Vec<CvHit> = points
            .iter()
            .filter(|(_, (_, meta))| skill.map_or(true, |s| meta.skills.iter().any(|k| k == s)))
            .map(|(id, (stored, meta))| CvHit {
                cv_id: id.clone(),
                score: cosine(&vector, stored),
                metadata: meta.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.cv_id.cmp(&b.cv_id)));
        hits.truncate(top_k as usize);
        Ok(hits)
    }

    async fn fetch(&self, cv_id: &str) -> Result<Option<CvMetadata>, VectorStoreError> {
        Ok(self.points.read().get(cv_id).map(|(_, meta)| meta.clone()))
    }

    async fn delete(&self, cv_id: &str) -> Result<(), VectorStoreError> {
        self.points.write().remove(cv_id);
        Ok(())
    }

    async fn describe(&self) -> Result<IndexStats, VectorStoreError> {
        Ok(IndexStats {
            backend: "memory",
            collection: self.collection.clone(),
            total_vectors: self.points.read().len() as u64,
            dimension: self.dimension,
        })
    }
}
