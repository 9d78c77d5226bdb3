pub mod chunking;
pub mod classify;
pub mod cleaning;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod models;
pub mod retriever;
pub mod retry;
pub mod segment;
pub mod source;
pub mod stores;
pub mod traits;

pub use chunking::{merge_by_budget, CharBudget, TokenWindow, TokenWindowChunker};
pub use classify::{classify, SpanStyle, HEADING_FONT_SIZE};
pub use cleaning::TextCleaner;
pub use config::{
    ChunkMode, ChunkingConfig, Distance, EmbeddingConfig, IndexConfig, PipelineConfig,
};
pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSION};
pub use error::{
    ChunkingError, EmbeddingError, ExtractionError, IndexError, IngestError, RetrieveError,
};
pub use ingest::{
    discover_document_files, BatchReport, FileReport, FileStatus, IngestPipeline,
};
pub use metadata::{chapter_from_filename, subject_from_filename, DifficultyPolicy};
pub use models::{
    Block, BlockType, Chunk, ChunkMetadata, ChunkPayload, ChunkRecord, ContextBlock, Difficulty,
    Page, ScoredPayload, SearchFilter, SearchResult, Section,
};
pub use retriever::{Retriever, FILTERABLE_FIELDS};
pub use retry::RetryPolicy;
pub use segment::segment_blocks;
pub use source::{JsonPageSource, PageSource};
pub use stores::{MemoryStore, QdrantStore};
pub use traits::{StoredPoint, VectorStore};
