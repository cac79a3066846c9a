use chrono::Utc;
use clap::{Parser, Subcommand};
use course_search_core::{
    ingest_course_folder, ChunkingConfig, CollectionNames, DualIndexStore, HashedTrigramEmbedder,
    QdrantStore, RetrievalEngine, SearchConfig, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "course-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Collection holding one record per course, used for name resolution
    #[arg(long, default_value = "course_catalog")]
    catalog_collection: String,

    /// Collection holding all course chunks
    #[arg(long, default_value = "course_content")]
    content_collection: String,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a folder of course documents (.txt, .pdf, .docx).
    Ingest {
        /// Folder scanned recursively for course documents.
        #[arg(long)]
        folder: String,

        /// Maximum characters per chunk.
        #[arg(long, default_value = "800")]
        max_chunk_chars: usize,

        /// Overlap budget in characters between consecutive chunks.
        #[arg(long, default_value = "100")]
        chunk_overlap_chars: usize,
    },
    /// Search course content with optional course and lesson filters.
    Search {
        /// Search query
        #[arg(long)]
        query: String,

        /// Course name, possibly partial or misspelled.
        #[arg(long)]
        course: Option<String>,

        /// Lesson number filter.
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results.
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Print corpus statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = HashedTrigramEmbedder::default();
    let backend = QdrantStore::new(&cli.qdrant_url, DEFAULT_EMBEDDING_DIMENSIONS)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let collections = CollectionNames {
        catalog: cli.catalog_collection.clone(),
        content: cli.content_collection.clone(),
    };
    let store = Arc::new(DualIndexStore::new(backend, embedder, collections));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "course-search boot"
    );

    match cli.command {
        Command::Ingest {
            folder,
            max_chunk_chars,
            chunk_overlap_chars,
        } => {
            let config = ChunkingConfig {
                max_chars: max_chunk_chars,
                overlap_chars: chunk_overlap_chars,
            };
            config
                .validate()
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            store
                .backend()
                .ensure_collection(&cli.catalog_collection)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            store
                .backend()
                .ensure_collection(&cli.content_collection)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let report = ingest_course_folder(&store, Path::new(&folder), config)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if !report.skipped.is_empty() {
                warn!(
                    skipped = report.skipped.len(),
                    folder = %folder,
                    "some documents were skipped"
                );
                for skipped in &report.skipped {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
                }
            }

            info!(
                ingest_id = %report.ingest_id,
                courses = report.courses.len(),
                chunks = report.chunk_count(),
                "ingestion finished"
            );
            for course in &report.courses {
                println!(
                    "{}: {} chunks ({})",
                    course.title,
                    course.chunk_count,
                    course.source_path.display()
                );
            }
            println!(
                "{} courses, {} chunks ingested at {}",
                report.courses.len(),
                report.chunk_count(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            let engine = RetrievalEngine::new(store, SearchConfig { max_results: limit });
            let results = engine
                .search(&query, course.as_deref(), lesson)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if results.is_empty() {
                println!("no relevant content found");
                return Ok(());
            }

            for hit in results {
                println!("[{}] distance={:.4}", hit.source.label, hit.distance);
                if let Some(link) = &hit.source.link {
                    println!("  link={link}");
                }
                println!("  {}", hit.content);
            }
        }
        Command::Stats => {
            let stats = store
                .course_stats()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("total_courses: {}", stats.total_courses);
            for title in stats.course_titles {
                println!("  {title}");
            }
        }
    }

    Ok(())
}
