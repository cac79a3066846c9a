use crate::error::SearchError;
use async_trait::async_trait;
use serde_json::Value;

/// One embeddable record inside a named collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    pub metadata: Value,
}

/// One similarity hit. `distance` is ascending dissimilarity: lower is more
/// relevant.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub metadata: Value,
    pub distance: f64,
}

/// AND-combined equality predicates over record metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    equals: Vec<(String, Value)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn predicates(&self) -> &[(String, Value)] {
        &self.equals
    }

    pub fn matches(&self, metadata: &Value) -> bool {
        self.equals
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}

/// Narrow contract for the vector-similarity backend: named collections of
/// records with embeddings, filtered nearest-neighbor queries, filtered
/// deletes. Everything the pipeline needs and nothing else, so tests can
/// inject an in-process implementation.
#[async_trait]
pub trait SimilarityIndex {
    /// Inserts or replaces records by id. `records` and `embeddings` are
    /// parallel slices.
    async fn upsert(
        &self,
        collection: &str,
        records: &[IndexRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError>;

    /// Nearest-neighbor query, filtered, at most `limit` hits ordered by
    /// ascending distance. Empty collections yield empty results.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<IndexHit>, SearchError>;

    /// Removes every record whose metadata matches the filter.
    async fn delete_matching(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), SearchError>;

    /// Fetches a single record by id.
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>, SearchError>;

    /// All record ids in the collection, in insertion order.
    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, SearchError>;
}
