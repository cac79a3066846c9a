use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{SearchConfig, SourceRef, SourcedChunk};
use crate::store::DualIndexStore;
use crate::traits::SimilarityIndex;
use std::sync::{Arc, Mutex};

/// Read-path façade: resolves an optional fuzzy course reference, runs the
/// filtered content search, and pairs every hit with a human-readable source
/// label. The labels of the most recent call are kept for the surrounding
/// application to display.
pub struct RetrievalEngine<B, E> {
    store: Arc<DualIndexStore<B, E>>,
    config: SearchConfig,
    last_sources: Mutex<Vec<SourceRef>>,
}

impl<B, E> RetrievalEngine<B, E>
where
    B: SimilarityIndex + Send + Sync,
    E: Embedder,
{
    pub fn new(store: Arc<DualIndexStore<B, E>>, config: SearchConfig) -> Self {
        Self {
            store,
            config,
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Searches course content. A given `course_name` must resolve or the
    /// whole call fails with `CourseNotFound` before any content query runs.
    /// An empty result list is a valid "nothing relevant" outcome.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<SourcedChunk>, SearchError> {
        let resolved = match course_name {
            Some(fragment) => Some(
                self.store
                    .resolve_course_name(fragment)
                    .await?
                    .ok_or_else(|| SearchError::CourseNotFound(fragment.to_string()))?,
            ),
            None => None,
        };

        let hits = self
            .store
            .search(
                query,
                resolved.as_deref(),
                lesson_number,
                self.config.max_results,
            )
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let (label, link) = match hit.lesson_number {
                Some(number) => (
                    format!("{} - Lesson {}", hit.course_title, number),
                    self.store.lesson_link(&hit.course_title, number).await?,
                ),
                None => (hit.course_title.clone(), None),
            };
            results.push(SourcedChunk {
                content: hit.content,
                source: SourceRef { label, link },
                distance: hit.distance,
            });
        }

        let sources = results.iter().map(|r| r.source.clone()).collect();
        *self.last_sources.lock().unwrap() = sources;

        Ok(results)
    }

    /// Source labels of the most recent `search` call.
    pub fn last_sources(&self) -> Vec<SourceRef> {
        self.last_sources.lock().unwrap().clone()
    }

    pub fn reset_sources(&self) {
        self.last_sources.lock().unwrap().clear();
    }
}
