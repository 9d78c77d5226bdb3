use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("document has no extractable text: {0}")]
    NoText(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum ChunkingError {
    #[error("tokenizer failed to load: {0}")]
    Tokenizer(String),

    #[error("token window in {document} did not decode cleanly: {detail}")]
    Decode { document: String, detail: String },
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service rejected the request: {0}")]
    Backend(String),

    #[error("embedding count {got} does not match input count {expected}")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding dimension {got} does not match configured dimension {expected}")]
    Dimension { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    Backend { backend: String, details: String },

    #[error(
        "collection {collection} holds {existing}-dimension vectors but {configured} is configured; \
         recreate the collection with a matching dimension"
    )]
    DimensionMismatch {
        collection: String,
        existing: usize,
        configured: usize,
    },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Chunking(#[from] ChunkingError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
