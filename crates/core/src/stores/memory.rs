use crate::error::SearchError;
use crate::traits::{IndexHit, IndexRecord, MetadataFilter, SimilarityIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

struct StoredRecord {
    record: IndexRecord,
    vector: Vec<f32>,
}

/// In-process similarity backend: brute-force cosine over everything in a
/// collection. Collections keep insertion order, so `list_ids` reflects
/// ingestion order. Intended for tests and single-process use.
#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 1.0;
    }
    1.0 - f64::from(dot / (norm_a * norm_b))
}

#[async_trait]
impl SimilarityIndex for MemoryIndex {
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

        let mut collections = self.collections.write().unwrap();
        let stored = collections.entry(collection.to_string()).or_default();
        for (record, vector) in records.iter().zip(embeddings) {
            stored.retain(|existing| existing.record.id != record.id);
            stored.push(StoredRecord {
                record: record.clone(),
                vector: vector.clone(),
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
        let collections = self.collections.read().unwrap();
        let stored = match collections.get(collection) {
            Some(stored) => stored,
            None => return Ok(Vec::new()),
        };

        let mut hits: Vec<IndexHit> = stored
            .iter()
            .filter(|entry| filter.matches(&entry.record.metadata))
            .map(|entry| IndexHit {
                id: entry.record.id.clone(),
                text: entry.record.text.clone(),
                metadata: entry.record.metadata.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_matching(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), SearchError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(stored) = collections.get_mut(collection) {
            stored.retain(|entry| !filter.matches(&entry.record.metadata));
        }
        Ok(())
    }

    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>, SearchError> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).and_then(|stored| {
            stored
                .iter()
                .find(|entry| entry.record.id == id)
                .map(|entry| entry.record.clone())
        }))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, SearchError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .map(|stored| {
                stored
                    .iter()
                    .map(|entry| entry.record.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
