use crate::chunking::{CharBudget, TokenWindow};
use crate::embeddings::DEFAULT_EMBEDDING_DIMENSION;
use crate::metadata::DifficultyPolicy;
use crate::retry::RetryPolicy;

/// Which chunk-construction algorithm the ingestion pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkMode {
    /// Character-budget merge per section content list.
    #[default]
    Sections,
    /// Token-budget sliding window over the whole document text.
    TokenWindows,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// Base URL of an OpenAI-style embedding service; `None` selects the
    /// offline hashing embedder.
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 16,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkingConfig {
    pub budget: CharBudget,
    pub window: TokenWindow,
    pub mode: ChunkMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
    pub distance: Distance,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "textbook_chunks".to_string(),
            distance: Distance::Cosine,
        }
    }
}

/// The single configuration value object for the whole pipeline, resolved
/// once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    pub retry: RetryPolicy,
    pub difficulty_policy: DifficultyPolicy,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            index: IndexConfig::default(),
            retry: RetryPolicy::default(),
            difficulty_policy: DifficultyPolicy::default(),
            top_k: 5,
        }
    }
}
