use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{Course, CourseChunk, CourseStats, ScoredChunk};
use crate::traits::{IndexRecord, MetadataFilter, SimilarityIndex};
use serde_json::{json, Value};
use tokio::sync::Mutex;

pub const CATALOG_COLLECTION: &str = "course_catalog";
pub const CONTENT_COLLECTION: &str = "course_content";

/// Names of the two collections the store addresses.
#[derive(Debug, Clone)]
pub struct CollectionNames {
    pub catalog: String,
    pub content: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            catalog: CATALOG_COLLECTION.to_string(),
            content: CONTENT_COLLECTION.to_string(),
        }
    }
}

/// Two logically separate collections over one similarity backend: a course
/// catalog (one record per course, searched only for name resolution) and a
/// content collection (one record per chunk, searched for answers).
///
/// Writers are serialized with a single lock so a re-ingestion's
/// delete-then-write pair is observed as one unit.
pub struct DualIndexStore<B, E> {
    backend: B,
    embedder: E,
    collections: CollectionNames,
    write_lock: Mutex<()>,
}

impl<B, E> DualIndexStore<B, E>
where
    B: SimilarityIndex + Send + Sync,
    E: Embedder,
{
    pub fn new(backend: B, embedder: E, collections: CollectionNames) -> Self {
        Self {
            backend,
            embedder,
            collections,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn collections(&self) -> &CollectionNames {
        &self.collections
    }

    /// Overwrites the catalog entry for this course.
    pub async fn upsert_course(&self, course: &Course) -> Result<(), SearchError> {
        let _guard = self.write_lock.lock().await;
        self.upsert_course_unlocked(course).await
    }

    /// Overwrites content entries sharing the chunks' storage ids.
    pub async fn upsert_chunks(&self, chunks: &[CourseChunk]) -> Result<(), SearchError> {
        let _guard = self.write_lock.lock().await;
        self.upsert_chunks_unlocked(chunks).await
    }

    /// Removes the course's catalog entry and every content entry carrying
    /// its title.
    pub async fn delete_course(&self, title: &str) -> Result<(), SearchError> {
        let _guard = self.write_lock.lock().await;
        self.delete_course_unlocked(title).await
    }

    /// Atomic re-ingestion: delete whatever is stored under the course title,
    /// then write the fresh metadata and chunks, all under the writer lock.
    pub async fn replace_course(
        &self,
        course: &Course,
        chunks: &[CourseChunk],
    ) -> Result<(), SearchError> {
        let _guard = self.write_lock.lock().await;
        self.delete_course_unlocked(&course.title).await?;
        self.upsert_course_unlocked(course).await?;
        self.upsert_chunks_unlocked(chunks).await
    }

    /// Fuzzy name resolution: top-1 similarity against the catalog, trusted
    /// as-is. `None` only when the catalog holds no courses.
    pub async fn resolve_course_name(&self, fragment: &str) -> Result<Option<String>, SearchError> {
        let vector = self.embedder.embed(fragment);
        let hits = self
            .backend
            .query(&self.collections.catalog, &vector, &MetadataFilter::new(), 1)
            .await?;
        Ok(hits.into_iter().next().map(|hit| hit.id))
    }

    /// Filtered similarity search over course content. Both filters are
    /// AND-combined equality predicates; an empty store yields an empty
    /// result, not an error.
    pub async fn search(
        &self,
        query_text: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let mut filter = MetadataFilter::new();
        if let Some(title) = course_title {
            filter = filter.with("course_title", title);
        }
        if let Some(number) = lesson_number {
            filter = filter.with("lesson_number", number);
        }

        let vector = self.embedder.embed(query_text);
        let hits = self
            .backend
            .query(&self.collections.content, &vector, &filter, limit)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredChunk {
                content: hit.text,
                course_title: hit
                    .metadata
                    .pointer("/course_title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                lesson_number: hit
                    .metadata
                    .pointer("/lesson_number")
                    .and_then(Value::as_u64)
                    .map(|number| number as u32),
                distance: hit.distance,
            })
            .collect())
    }

    /// Link of one lesson, read back from the catalog sidecar metadata.
    pub async fn lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>, SearchError> {
        let record = self
            .backend
            .fetch(&self.collections.catalog, course_title)
            .await?;
        Ok(record.and_then(|record| {
            record
                .metadata
                .pointer("/lessons")
                .and_then(Value::as_array)
                .and_then(|lessons| {
                    lessons
                        .iter()
                        .find(|lesson| {
                            lesson.pointer("/number").and_then(Value::as_u64)
                                == Some(u64::from(lesson_number))
                        })
                        .and_then(|lesson| lesson.pointer("/link"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
        }))
    }

    pub async fn existing_course_titles(&self) -> Result<Vec<String>, SearchError> {
        self.backend.list_ids(&self.collections.catalog).await
    }

    pub async fn course_stats(&self) -> Result<CourseStats, SearchError> {
        let titles = self.existing_course_titles().await?;
        Ok(CourseStats {
            total_courses: titles.len(),
            course_titles: titles,
        })
    }

    async fn upsert_course_unlocked(&self, course: &Course) -> Result<(), SearchError> {
        let record = IndexRecord {
            id: course.title.clone(),
            text: course.title.clone(),
            metadata: json!({
                "title": course.title,
                "instructor": course.instructor,
                "course_link": course.course_link,
                "lessons": serde_json::to_value(&course.lessons)?,
            }),
        };
        let embedding = self.embedder.embed(&course.title);
        self.backend
            .upsert(&self.collections.catalog, &[record], &[embedding])
            .await
    }

    async fn upsert_chunks_unlocked(&self, chunks: &[CourseChunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let records: Vec<IndexRecord> = chunks
            .iter()
            .map(|chunk| IndexRecord {
                id: chunk.storage_id(),
                text: chunk.content.clone(),
                metadata: json!({
                    "course_title": chunk.course_title,
                    "lesson_number": chunk.lesson_number,
                    "chunk_index": chunk.chunk_index,
                }),
            })
            .collect();
        let embeddings: Vec<Vec<f32>> = chunks
            .iter()
            .map(|chunk| self.embedder.embed(&chunk.content))
            .collect();

        self.backend
            .upsert(&self.collections.content, &records, &embeddings)
            .await
    }

    async fn delete_course_unlocked(&self, title: &str) -> Result<(), SearchError> {
        self.backend
            .delete_matching(
                &self.collections.catalog,
                &MetadataFilter::new().with("title", title),
            )
            .await?;
        self.backend
            .delete_matching(
                &self.collections.content,
                &MetadataFilter::new().with("course_title", title),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionNames, DualIndexStore};
    use crate::embeddings::HashedTrigramEmbedder;
    use crate::models::{Course, CourseChunk, Lesson};
    use crate::stores::MemoryIndex;
    use crate::traits::SimilarityIndex;

    fn store() -> DualIndexStore<MemoryIndex, HashedTrigramEmbedder> {
        DualIndexStore::new(
            MemoryIndex::new(),
            HashedTrigramEmbedder::default(),
            CollectionNames::default(),
        )
    }

    fn course(title: &str) -> Course {
        Course {
            title: title.to_string(),
            course_link: None,
            instructor: Some("Dr. Smith".to_string()),
            lessons: vec![
                Lesson {
                    number: 0,
                    title: "Basics".to_string(),
                    link: Some("https://example.com/lesson0".to_string()),
                },
                Lesson {
                    number: 1,
                    title: "Growth".to_string(),
                    link: None,
                },
            ],
        }
    }

    fn chunk(title: &str, lesson: Option<u32>, index: usize, content: &str) -> CourseChunk {
        CourseChunk {
            content: content.to_string(),
            course_title: title.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    #[tokio::test]
    async fn resolution_on_an_empty_store_finds_nothing() {
        let store = store();
        assert_eq!(store.resolve_course_name("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn misspelled_fragments_resolve_to_the_stored_title() {
        let store = store();
        store.upsert_course(&course("Intro to X")).await.unwrap();

        let resolved = store.resolve_course_name("itro to x").await.unwrap();
        assert_eq!(resolved.as_deref(), Some("Intro to X"));
    }

    #[tokio::test]
    async fn search_on_an_empty_store_is_empty_not_an_error() {
        let store = store();
        let hits = store.search("anything", None, None, 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn lesson_filter_is_mandatory_not_advisory() {
        let store = store();
        store.upsert_course(&course("Intro to X")).await.unwrap();
        store
            .upsert_chunks(&[
                chunk(
                    "Intro to X",
                    Some(0),
                    0,
                    "arrays and ordering, the exact query text",
                ),
                chunk("Intro to X", Some(1), 1, "something else entirely"),
            ])
            .await
            .unwrap();

        // Lesson 0 scores far better textually, but the filter wins.
        let hits = store
            .search(
                "arrays and ordering, the exact query text",
                Some("Intro to X"),
                Some(1),
                5,
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lesson_number, Some(1));
        assert_eq!(hits[0].content, "something else entirely");
    }

    #[tokio::test]
    async fn course_filter_excludes_other_courses() {
        let store = store();
        store.upsert_course(&course("Course A")).await.unwrap();
        store.upsert_course(&course("Course B")).await.unwrap();
        store
            .upsert_chunks(&[
                chunk("Course A", Some(0), 0, "shared words in both courses"),
                chunk("Course B", Some(0), 0, "shared words in both courses"),
            ])
            .await
            .unwrap();

        let hits = store
            .search("shared words", Some("Course B"), None, 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].course_title, "Course B");
    }

    #[tokio::test]
    async fn replace_course_is_idempotent() {
        let store = store();
        let chunks = vec![
            chunk("Intro to X", Some(0), 0, "first chunk"),
            chunk("Intro to X", Some(1), 1, "second chunk"),
        ];

        store
            .replace_course(&course("Intro to X"), &chunks)
            .await
            .unwrap();
        store
            .replace_course(&course("Intro to X"), &chunks)
            .await
            .unwrap();

        let ids = store
            .backend()
            .list_ids(super::CONTENT_COLLECTION)
            .await
            .unwrap();
        assert_eq!(ids, vec!["Intro to X_0", "Intro to X_1"]);
        assert_eq!(store.course_stats().await.unwrap().total_courses, 1);
    }

    #[tokio::test]
    async fn replacing_a_modified_course_leaves_no_stale_chunks() {
        let store = store();
        store
            .replace_course(
                &course("Intro to X"),
                &[
                    chunk("Intro to X", Some(0), 0, "old first"),
                    chunk("Intro to X", Some(1), 1, "old second"),
                    chunk("Intro to X", Some(1), 2, "old third"),
                ],
            )
            .await
            .unwrap();

        store
            .replace_course(
                &course("Intro to X"),
                &[chunk("Intro to X", Some(0), 0, "new only")],
            )
            .await
            .unwrap();

        let hits = store.search("old second", None, None, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "new only");
    }

    #[tokio::test]
    async fn delete_course_removes_catalog_and_content_entries() {
        let store = store();
        store
            .replace_course(
                &course("Intro to X"),
                &[chunk("Intro to X", Some(0), 0, "content")],
            )
            .await
            .unwrap();

        store.delete_course("Intro to X").await.unwrap();

        assert_eq!(store.course_stats().await.unwrap().total_courses, 0);
        assert!(store.search("content", None, None, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lesson_links_come_back_from_catalog_metadata() {
        let store = store();
        store.upsert_course(&course("Intro to X")).await.unwrap();

        assert_eq!(
            store.lesson_link("Intro to X", 0).await.unwrap().as_deref(),
            Some("https://example.com/lesson0")
        );
        assert_eq!(store.lesson_link("Intro to X", 1).await.unwrap(), None);
        assert_eq!(store.lesson_link("Unknown", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stats_report_titles_in_ingestion_order() {
        let store = store();
        store.upsert_course(&course("First Course")).await.unwrap();
        store.upsert_course(&course("Second Course")).await.unwrap();

        let stats = store.course_stats().await.unwrap();
        assert_eq!(stats.total_courses, 2);
        assert_eq!(stats.course_titles, vec!["First Course", "Second Course"]);
    }
}
