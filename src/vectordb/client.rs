use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use tracing::{debug, info};

use super::VectorStore;
use super::error::VectorDbError;
use super::model::{PartitionFilter, VectorHit, VectorPoint};
use crate::hashing::hash_to_u64;

const PAYLOAD_PASSAGE_ID: &str = "passage_id";
const PAYLOAD_PARTITION: &str = "partition";

/// Points sent per upsert request.
const UPSERT_BATCH: usize = 256;

#[derive(Clone)]
/// Qdrant-backed [`VectorStore`] bound to one collection.
///
/// Point ids are a 64-bit hash of the passage id; the passage id itself travels in the
/// payload and is what searches return.
pub struct QdrantStore {
    client: Qdrant,
    url: String,
    collection: String,
    dimension: usize,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl QdrantStore {
    /// Connects to `url` and makes sure `collection` exists with cosine distance.
    pub async fn connect(
        url: &str,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        let store = Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            dimension,
        };
        store.health_check().await?;
        store.ensure_collection().await?;
        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn ensure_collection(&self) -> Result<(), VectorDbError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorDbError::CreateCollectionFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        if exists {
            debug!(collection = %self.collection, "Qdrant collection already exists");
            return Ok(());
        }

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await
            .map_err(|e| VectorDbError::CreateCollectionFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        info!(collection = %self.collection, dimension = self.dimension, "Created Qdrant collection");
        Ok(())
    }

    fn to_point_struct(point: VectorPoint) -> PointStruct {
        let mut payload: HashMap<String, Value> = HashMap::new();
        let id = hash_to_u64(point.passage_id.as_bytes());
        payload.insert(PAYLOAD_PASSAGE_ID.to_string(), point.passage_id.into());
        payload.insert(PAYLOAD_PARTITION.to_string(), point.partition.into());
        PointStruct::new(id, point.vector, payload)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(&self, points: Vec<VectorPoint>) -> Result<(), VectorDbError> {
        if let Some(bad) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(VectorDbError::InvalidDimension {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let total = points.len();
        let mut structs: Vec<PointStruct> = points.into_iter().map(Self::to_point_struct).collect();
        while !structs.is_empty() {
            let rest = structs.split_off(structs.len().min(UPSERT_BATCH));
            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, structs).wait(true))
                .await
                .map_err(|e| VectorDbError::UpsertFailed {
                    collection: self.collection.clone(),
                    message: e.to_string(),
                })?;
            structs = rest;
        }

        debug!(collection = %self.collection, points = total, "Upserted points");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PartitionFilter>,
    ) -> Result<Vec<VectorHit>, VectorDbError> {
        if vector.len() != self.dimension {
            return Err(VectorDbError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut search =
            SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64).with_payload(true);
        if let Some(filter) = filter {
            let conditions: Vec<Condition> = filter
                .iter()
                .map(|p| Condition::matches(PAYLOAD_PARTITION, p.to_string()))
                .collect();
            search = search.filter(Filter::should(conditions));
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let passage_id = point
                    .payload
                    .get(PAYLOAD_PASSAGE_ID)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())?;
                Some(VectorHit {
                    passage_id,
                    score: point.score,
                })
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}
