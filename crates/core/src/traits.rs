use crate::error::IndexError;
use crate::models::{ChunkPayload, ChunkRecord, ScoredPayload, SearchFilter};
use async_trait::async_trait;

/// A stored point as returned by bulk export.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: u64,
    pub vector: Option<Vec<f32>>,
    pub payload: ChunkPayload,
}

/// A collection of (id, vector, payload) records answering filtered top-k
/// similarity queries. The store exclusively owns the durable records once
/// written; readers only receive copies.
#[async_trait]
pub trait VectorStore {
    /// Vector dimension the store was configured with.
    fn dimension(&self) -> usize;

    /// Creates the collection if missing; a no-op when an equivalent one
    /// exists, an error when the existing dimension differs.
    async fn ensure_collection(&self) -> Result<(), IndexError>;

    /// Deletes and recreates the collection. Not atomic: queries issued
    /// during the window observe an empty or missing collection.
    async fn recreate_collection(&self) -> Result<(), IndexError>;

    /// Writes records; last write wins on id collision.
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<(), IndexError>;

    /// Removes every point whose payload matches the filter. An empty filter
    /// matches every point.
    async fn delete(&self, filter: &SearchFilter) -> Result<(), IndexError>;

    /// Top-`limit` payloads by similarity, descending score. An empty filter
    /// means unrestricted search.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPayload>, IndexError>;

    async fn count(&self) -> Result<u64, IndexError>;

    /// Pages through all stored points for bulk export. Returns the page and
    /// the offset to resume from, `None` once exhausted.
    async fn scroll(
        &self,
        offset: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<StoredPoint>, Option<u64>), IndexError>;
}
