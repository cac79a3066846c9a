use crate::error::SearchError;
use crate::traits::{IndexHit, IndexRecord, MetadataFilter, SimilarityIndex};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use url::Url;

/// Similarity backend over Qdrant's REST API. Record ids are arbitrary
/// strings; Qdrant point ids must be integers or UUIDs, so each record id is
/// hashed to a stable u64 point id and the original id travels in the
/// payload.
pub struct QdrantStore {
    endpoint: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(endpoint: &str, vector_size: usize) -> Result<Self, SearchError> {
        let parsed = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            client: Client::new(),
            vector_size,
        })
    }

    /// Creates the collection if it does not exist yet.
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .get(format!("{}/collections/{}", self.endpoint, collection))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        if !response.status().is_client_error() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, collection))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    fn check_vector(&self, vector: &[f32]) -> Result<(), SearchError> {
        if vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "vector dimension {} does not match configured {}",
                vector.len(),
                self.vector_size
            )));
        }
        Ok(())
    }
}

/// Stable integer point id derived from a record id.
pub(crate) fn point_id(record_id: &str) -> u64 {
    let digest = Sha256::digest(record_id.as_bytes());
    digest
        .iter()
        .take(8)
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// Qdrant filter clause for AND-combined metadata equality.
pub(crate) fn filter_clause(filter: &MetadataFilter) -> Value {
    let must: Vec<Value> = filter
        .predicates()
        .iter()
        .map(|(key, value)| {
            json!({
                "key": format!("metadata.{key}"),
                "match": { "value": value },
            })
        })
        .collect();
    json!({ "must": must })
}

fn hit_from_point(point: &Value) -> IndexHit {
    let payload = point.pointer("/payload").cloned().unwrap_or(Value::Null);
    let score = point.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
    IndexHit {
        id: payload
            .pointer("/id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        text: payload
            .pointer("/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        metadata: payload.pointer("/metadata").cloned().unwrap_or(Value::Null),
        // Qdrant reports cosine similarity (higher is better).
        distance: 1.0 - score,
    }
}

#[async_trait]
impl SimilarityIndex for QdrantStore {
    async fn upsert(
        &self,
        collection: &str,
        records: &[IndexRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} does not match record count {}",
                embeddings.len(),
                records.len()
            )));
        }
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                self.check_vector(embedding)?;
                Ok(json!({
                    "id": point_id(&record.id),
                    "vector": embedding,
                    "payload": {
                        "id": record.id,
                        "text": record.text,
                        "metadata": record.metadata,
                    },
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<IndexHit>, SearchError> {
        self.check_vector(vector)?;

        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if !filter.is_empty() {
            body["filter"] = filter_clause(filter);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, collection
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let points = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(points.iter().map(hit_from_point).collect())
    }

    async fn delete_matching(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), SearchError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, collection
            ))
            .json(&json!({ "filter": filter_clause(filter) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>, SearchError> {
        let response = self
            .client
            .get(format!(
                "{}/collections/{}/points/{}",
                self.endpoint,
                collection,
                point_id(id)
            ))
            .send()
            .await?;

        if response.status().is_client_error() {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let payload = match parsed.pointer("/result/payload") {
            Some(payload) => payload,
            None => return Ok(None),
        };

        Ok(Some(IndexRecord {
            id: payload
                .pointer("/id")
                .and_then(Value::as_str)
                .unwrap_or(id)
                .to_string(),
            text: payload
                .pointer("/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            metadata: payload.pointer("/metadata").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/scroll",
                self.endpoint, collection
            ))
            .json(&json!({
                "limit": 10_000,
                "with_payload": ["id"],
                "with_vector": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let points = parsed
            .pointer("/result/points")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(points
            .iter()
            .filter_map(|point| {
                point
                    .pointer("/payload/id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }
}
