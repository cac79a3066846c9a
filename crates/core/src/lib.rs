pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod retrieval;
pub mod segmenter;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_sentences, ChunkingConfig};
pub use embeddings::{Embedder, HashedTrigramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, SearchError};
pub use extractor::read_course_text;
pub use ingest::{
    digest_file, discover_course_files, ingest_course_folder, IngestedCourse, IngestionReport,
    SkippedDocument,
};
pub use models::{
    Course, CourseChunk, CourseStats, Lesson, ScoredChunk, SearchConfig, SourceRef, SourcedChunk,
};
pub use parser::{DocumentParser, ParsedCourse};
pub use retrieval::RetrievalEngine;
pub use segmenter::SentenceSegmenter;
pub use store::{CollectionNames, DualIndexStore, CATALOG_COLLECTION, CONTENT_COLLECTION};
pub use stores::{MemoryIndex, QdrantStore};
pub use traits::{IndexHit, IndexRecord, MetadataFilter, SimilarityIndex};
