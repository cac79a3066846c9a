use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{is_supported_extension, read_course_text};
use crate::parser::DocumentParser;
use crate::store::DualIndexStore;
use crate::traits::SimilarityIndex;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Recursively finds course documents (`.txt`, `.pdf`, `.docx`) under a
/// folder, sorted for deterministic ingestion order.
pub fn discover_course_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(is_supported_extension);

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// A document the batch skipped, with the reason it was skipped.
#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// One successfully ingested document.
#[derive(Debug)]
pub struct IngestedCourse {
    pub title: String,
    pub source_path: PathBuf,
    pub checksum: String,
    pub chunk_count: usize,
}

/// Outcome of one ingestion run.
#[derive(Debug)]
pub struct IngestionReport {
    pub ingest_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub courses: Vec<IngestedCourse>,
    pub skipped: Vec<SkippedDocument>,
}

impl IngestionReport {
    fn new() -> Self {
        Self {
            ingest_id: Uuid::new_v4(),
            started_at: Utc::now(),
            courses: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.courses.iter().map(|course| course.chunk_count).sum()
    }

    pub fn course_titles(&self) -> Vec<&str> {
        self.courses.iter().map(|course| course.title.as_str()).collect()
    }
}

/// Sequentially ingests every supported document under `folder` into the
/// store. Failures are isolated per document: a malformed or unreadable file
/// is recorded as skipped and never aborts its siblings. Documents whose
/// course title is already stored replace the prior version wholesale.
pub async fn ingest_course_folder<B, E>(
    store: &DualIndexStore<B, E>,
    folder: &Path,
    config: ChunkingConfig,
) -> Result<IngestionReport, IngestError>
where
    B: SimilarityIndex + Send + Sync,
    E: Embedder,
{
    let parser = DocumentParser::new(config)?;
    let mut report = IngestionReport::new();

    for path in discover_course_files(folder) {
        let prepared = read_course_text(&path).and_then(|raw| {
            let parsed = parser.parse(&raw, &path.to_string_lossy())?;
            let checksum = digest_file(&path)?;
            Ok((parsed, checksum))
        });

        let (parsed, checksum) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                report.skipped.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        match store.replace_course(&parsed.course, &parsed.chunks).await {
            Ok(()) => report.courses.push(IngestedCourse {
                title: parsed.course.title,
                source_path: path,
                checksum,
                chunk_count: parsed.chunks.len(),
            }),
            Err(error) => report.skipped.push(SkippedDocument {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{digest_file, discover_course_files, ingest_course_folder};
    use crate::chunking::ChunkingConfig;
    use crate::embeddings::HashedTrigramEmbedder;
    use crate::store::{CollectionNames, DualIndexStore, CONTENT_COLLECTION};
    use crate::stores::MemoryIndex;
    use crate::traits::SimilarityIndex;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn store() -> DualIndexStore<MemoryIndex, HashedTrigramEmbedder> {
        DualIndexStore::new(
            MemoryIndex::new(),
            HashedTrigramEmbedder::default(),
            CollectionNames::default(),
        )
    }

    const GOOD_DOC: &str = "\
Course Title: Intro to X
Course Link: https://example.com
Course Instructor: Dr. Smith

Lesson 0: Basics
Dr. Smith explains arrays. Arrays are ordered.

Lesson 1: Growth
Lists can grow. Maps hold pairs.
";

    #[test]
    fn discovery_is_recursive_and_extension_filtered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;

        File::create(dir.path().join("a.txt")).and_then(|mut f| f.write_all(b"x"))?;
        File::create(nested.join("b.docx")).and_then(|mut f| f.write_all(b"x"))?;
        File::create(dir.path().join("ignored.md")).and_then(|mut f| f.write_all(b"x"))?;

        let files = discover_course_files(dir.path());
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksums_are_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("a.txt");
        fs::write(&path, b"course text")?;

        assert_eq!(digest_file(&path)?, digest_file(&path)?);
        Ok(())
    }

    #[tokio::test]
    async fn one_malformed_document_does_not_abort_the_batch(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("good.txt"), GOOD_DOC)?;
        fs::write(dir.path().join("bad.txt"), "this file has no header at all")?;

        let store = store();
        let report =
            ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;

        assert_eq!(report.course_titles(), vec!["Intro to X"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("malformed course header"));
        assert!(report.chunk_count() > 0);
        Ok(())
    }

    #[tokio::test]
    async fn reingesting_an_unchanged_folder_is_idempotent(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("course.txt"), GOOD_DOC)?;

        let store = store();
        ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;
        let first_ids = store.backend().list_ids(CONTENT_COLLECTION).await?;

        ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;
        let second_ids = store.backend().list_ids(CONTENT_COLLECTION).await?;

        assert_eq!(first_ids, second_ids);
        assert_eq!(store.course_stats().await?.total_courses, 1);
        Ok(())
    }

    #[tokio::test]
    async fn a_modified_course_fully_replaces_its_predecessor(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("course.txt");
        fs::write(&path, GOOD_DOC)?;

        let store = store();
        ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;

        fs::write(
            &path,
            "Course Title: Intro to X\n\nLesson 0: Rewritten\nEverything is new now.",
        )?;
        ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;

        let hits = store.search("arrays ordered", None, None, 10).await?;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("Everything is new now."));
        Ok(())
    }

    #[tokio::test]
    async fn empty_folder_produces_an_empty_report() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = store();
        let report =
            ingest_course_folder(&store, dir.path(), ChunkingConfig::default()).await?;

        assert!(report.courses.is_empty());
        assert!(report.skipped.is_empty());
        Ok(())
    }
}
