//! Qdrant backend.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, PointsIdsList, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{Map, Number, Value};
use tracing::info;

use super::{CvHit, IndexStats, VectorStore, VectorStoreError};
use crate::matching::models::CvMetadata;

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.into(),
            dimension,
        })
    }
}

/// Qdrant payload value to plain JSON.
fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(n)) => Value::Number(n.into()),
        Some(Kind::DoubleValue(f)) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

fn metadata_from_payload(payload: HashMap<String, QdrantValue>) -> Result<CvMetadata, VectorStoreError> {
    let object: Map<String, Value> = payload.into_iter().map(|(k, v)| (k, to_json(v))).collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| VectorStoreError::Payload(e.to_string()))
}

fn point_id_string(id: Option<PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
        if exists {
            info!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;

        info!(collection = %self.collection, dimension = self.dimension, "Collection created");
        Ok(())
    }

    async fn upsert(
        &self,
        cv_id: &str,
        vector: Vec<f32>,
        metadata: &CvMetadata,
    ) -> Result<(), VectorStoreError> {
        let json = serde_json::to_value(metadata).map_err(|e| VectorStoreError::Payload(e.to_string()))?;
        let payload = Payload::try_from(json).map_err(|e| VectorStoreError::Payload(e.to_string()))?;
        let point = PointStruct::new(PointId::from(cv_id.to_string()), vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;

        info!(cv_id, "Upserted CV vector");
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        skill: Option<&str>,
    ) -> Result<Vec<CvHit>, VectorStoreError> {
        let mut search = SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if let Some(skill) = skill {
            search = search.filter(Filter::must([Condition::matches("skills", skill.to_string())]));
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                Ok(CvHit {
                    cv_id: point_id_string(point.id),
                    score: point.score,
                    metadata: metadata_from_payload(point.payload)?,
                })
            })
            .collect::<Result<Vec<_>, VectorStoreError>>()?;

        info!(count = hits.len(), "Found similar CVs");
        Ok(hits)
    }

    async fn fetch(&self, cv_id: &str) -> Result<Option<CvMetadata>, VectorStoreError> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(cv_id.to_string())])
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

        response
            .result
            .into_iter()
            .next()
            .map(|point| metadata_from_payload(point.payload))
            .transpose()
    }

    async fn delete(&self, cv_id: &str) -> Result<(), VectorStoreError> {
        let ids = PointsIdsList {
            ids: vec![PointId::from(cv_id.to_string())],
        };
        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(ids).wait(true))
            .await
            .map_err(|e| VectorStoreError::Delete(e.to_string()))?;

        info!(cv_id, "Deleted CV vector");
        Ok(())
    }

    async fn describe(&self) -> Result<IndexStats, VectorStoreError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;

        Ok(IndexStats {
            backend: "qdrant",
            collection: self.collection.clone(),
            total_vectors: info.result.and_then(|r| r.points_count).unwrap_or(0),
            dimension: self.dimension,
        })
    }
}
