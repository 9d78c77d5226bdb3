use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use edurag_core::{
    ChunkMode, DifficultyPolicy, Embedder, HashEmbedder, HttpEmbedder, IngestPipeline,
    PipelineConfig, QdrantStore, Retriever, RetryPolicy, VectorStore,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "edurag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "textbook_chunks")]
    collection: String,

    /// Base URL of an OpenAI-style embedding service; omit to use the
    /// offline hashing embedder.
    #[arg(long)]
    embedding_url: Option<String>,

    /// Embedding model name sent to the service.
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// API key for the embedding service.
    #[arg(long, env = "EMBEDDING_API_KEY")]
    embedding_api_key: Option<String>,

    /// Vector dimension of both the embedder and the collection.
    #[arg(long, default_value = "384")]
    dimension: usize,

    /// Chunks per embedding request.
    #[arg(long, default_value = "16")]
    batch_size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkModeArg {
    Sections,
    TokenWindows,
}

impl From<ChunkModeArg> for ChunkMode {
    fn from(value: ChunkModeArg) -> Self {
        match value {
            ChunkModeArg::Sections => ChunkMode::Sections,
            ChunkModeArg::TokenWindows => ChunkMode::TokenWindows,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyPolicyArg {
    Positional,
    ContentKeyword,
}

impl From<DifficultyPolicyArg> for DifficultyPolicy {
    fn from(value: DifficultyPolicyArg) -> Self {
        match value {
            DifficultyPolicyArg::Positional => DifficultyPolicy::Positional,
            DifficultyPolicyArg::ContentKeyword => DifficultyPolicy::ContentKeyword,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a folder of extracted textbook documents.
    Ingest {
        /// Folder searched recursively for .json documents.
        #[arg(long)]
        folder: String,
        /// Chunk construction algorithm.
        #[arg(long, value_enum, default_value = "sections")]
        mode: ChunkModeArg,
        /// How chunk difficulty is derived.
        #[arg(long, value_enum, default_value = "positional")]
        difficulty: DifficultyPolicyArg,
        /// Drop and recreate the collection before ingesting.
        #[arg(long, default_value_t = false)]
        recreate: bool,
    },
    /// Semantic search over indexed chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Restrict to one chapter, e.g. "Chapter 3".
        #[arg(long)]
        chapter: Option<String>,
        /// Restrict to one subject, e.g. "Science".
        #[arg(long)]
        subject: Option<String>,
        /// Restrict to one difficulty: Basic, Intermediate or Advanced.
        #[arg(long)]
        difficulty: Option<String>,
        /// Number of results to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Print a formatted context block for a topic.
    Context {
        /// Topic to assemble context for.
        #[arg(long)]
        topic: String,
        #[arg(long)]
        chapter: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        /// Number of chunks in the context.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Drop and recreate the collection.
    Recreate,
    /// Print the number of indexed points.
    Stats,
    /// Dump stored payloads as JSON lines.
    Export {
        /// Points per scroll page.
        #[arg(long, default_value = "100")]
        limit: usize,
    },
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Box<dyn Embedder + Send + Sync>> {
    match &cli.embedding_url {
        Some(url) => Ok(Box::new(HttpEmbedder::new(
            url,
            cli.embedding_model.clone(),
            cli.dimension,
            cli.embedding_api_key.as_deref(),
            RetryPolicy::default(),
        )?)),
        None => Ok(Box::new(HashEmbedder {
            dimensions: cli.dimension,
        })),
    }
}

fn build_config(cli: &Cli) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.embedding.model = cli.embedding_model.clone();
    config.embedding.dimension = cli.dimension;
    config.embedding.batch_size = cli.batch_size;
    config.embedding.endpoint = cli.embedding_url.clone();
    config.index.url = cli.qdrant_url.clone();
    config.index.collection = cli.collection.clone();
    config
}

fn collect_filters(
    chapter: Option<String>,
    subject: Option<String>,
    difficulty: Option<String>,
) -> HashMap<String, String> {
    let mut filters = HashMap::new();
    if let Some(chapter) = chapter {
        filters.insert("chapter".to_string(), chapter);
    }
    if let Some(subject) = subject {
        filters.insert("subject".to_string(), subject);
    }
    if let Some(difficulty) = difficulty {
        filters.insert("difficulty".to_string(), difficulty);
    }
    filters
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);
    let store = QdrantStore::new(&config.index, cli.dimension, config.retry)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        collection = %cli.collection,
        dimension = cli.dimension,
        "edurag boot"
    );

    match cli.command {
        Command::Ingest {
            ref folder,
            mode,
            difficulty,
            recreate,
        } => {
            let mut config = config;
            config.chunking.mode = mode.into();
            config.difficulty_policy = difficulty.into();

            if recreate {
                store.recreate_collection().await?;
            }

            let embedder = build_embedder(&cli)?;
            let pipeline = IngestPipeline::new(store, embedder, config)?;
            let report = pipeline.ingest_folder(Path::new(&folder)).await?;

            for file in &report.files {
                match &file.status {
                    edurag_core::FileStatus::Indexed { chunks } => {
                        println!("indexed {} ({chunks} chunks)", file.file);
                    }
                    edurag_core::FileStatus::Failed { message } => {
                        println!("failed  {}: {message}", file.file);
                    }
                }
            }
            println!(
                "{} files indexed, {} failed, {} chunks at {}",
                report.indexed_files(),
                report.failed_files(),
                report.total_chunks,
                report.completed_at.to_rfc3339()
            );
        }
        Command::Search {
            ref query,
            ref chapter,
            ref subject,
            ref difficulty,
            top_k,
        } => {
            let embedder = build_embedder(&cli)?;
            let retriever = Retriever::new(store, embedder);
            let filters = collect_filters(chapter.clone(), subject.clone(), difficulty.clone());
            let results = retriever.retrieve(&query, &filters, top_k).await?;

            if results.is_empty() {
                println!("no results");
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "[{}] score={:.4} {} - {} ({})",
                    rank + 1,
                    result.score,
                    result.chapter,
                    result.subject,
                    result.difficulty
                );
                println!("  source={}", result.source_file);
                println!("  {}", result.text);
            }
        }
        Command::Context {
            ref topic,
            ref chapter,
            ref subject,
            top_k,
        } => {
            let embedder = build_embedder(&cli)?;
            let retriever = Retriever::new(store, embedder);
            let filters = collect_filters(chapter.clone(), subject.clone(), None);
            let context = retriever.context_for(&topic, &filters, top_k).await?;

            println!("{}", context.text);
            if !context.chapters.is_empty() {
                println!("chapters: {}", context.chapters.join(", "));
                println!("sources: {}", context.sources.join(", "));
            }
        }
        Command::Recreate => {
            store.recreate_collection().await?;
            println!("collection {} recreated at {}", cli.collection, Utc::now().to_rfc3339());
        }
        Command::Stats => {
            let count = store.count().await?;
            println!("collection={} points={count}", cli.collection);
        }
        Command::Export { limit } => {
            let mut offset = None;
            loop {
                let (points, next) = store.scroll(offset, limit).await?;
                for point in points {
                    let mut line = serde_json::to_value(&point.payload)?;
                    line["id"] = serde_json::json!(point.id);
                    println!("{line}");
                }
                match next {
                    Some(value) => offset = Some(value),
                    None => break,
                }
            }
        }
    }

    Ok(())
}
