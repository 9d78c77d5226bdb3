use crate::error::IndexError;
use crate::models::{ChunkPayload, ChunkRecord, ScoredPayload, SearchFilter};
use crate::traits::{StoredPoint, VectorStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryPoint {
    vector: Vec<f32>,
    payload: ChunkPayload,
}

/// Brute-force in-memory vector store. Search is an exhaustive cosine scan,
/// which is exact and plenty fast at test and demo sizes.
pub struct MemoryStore {
    dimension: usize,
    points: RwLock<BTreeMap<u64, MemoryPoint>>,
}

impl MemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            points: RwLock::new(BTreeMap::new()),
        }
    }

    /// Fetches one payload by id, mainly for tests.
    pub fn get(&self, id: u64) -> Option<ChunkPayload> {
        self.points
            .read()
            .unwrap()
            .get(&id)
            .map(|point| point.payload.clone())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn payload_matches(payload: &ChunkPayload, filter: &SearchFilter) -> bool {
    filter.must.iter().all(|(key, value)| match key.as_str() {
        "chapter" => payload.chapter == *value,
        "subject" => payload.subject == *value,
        "difficulty" => payload.difficulty.to_string() == *value,
        "source_file" => payload.source_file == *value,
        "section" => payload.section.as_deref() == Some(value.as_str()),
        _ => false,
    })
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_collection(&self) -> Result<(), IndexError> {
        Ok(())
    }

    async fn recreate_collection(&self) -> Result<(), IndexError> {
        self.points.write().unwrap().clear();
        Ok(())
    }

    async fn upsert(&self, records: &[ChunkRecord]) -> Result<(), IndexError> {
        let mut points = self.points.write().unwrap();
        for record in records {
            points.insert(
                record.id,
                MemoryPoint {
                    vector: record.vector.clone(),
                    payload: record.payload.clone(),
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, filter: &SearchFilter) -> Result<(), IndexError> {
        self.points
            .write()
            .unwrap()
            .retain(|_, point| !payload_matches(&point.payload, filter));
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPayload>, IndexError> {
        let points = self.points.read().unwrap();
        let mut scored: Vec<ScoredPayload> = points
            .values()
            .filter(|point| payload_matches(&point.payload, filter))
            .map(|point| ScoredPayload {
                payload: point.payload.clone(),
                score: cosine(vector, &point.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64, IndexError> {
        Ok(self.points.read().unwrap().len() as u64)
    }

    async fn scroll(
        &self,
        offset: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<StoredPoint>, Option<u64>), IndexError> {
        let points = self.points.read().unwrap();
        let page: Vec<StoredPoint> = points
            .range(offset.unwrap_or(0)..)
            .take(limit)
            .map(|(id, point)| StoredPoint {
                id: *id,
                vector: Some(point.vector.clone()),
                payload: point.payload.clone(),
            })
            .collect();

        let next = page
            .last()
            .and_then(|last| points.range(last.id + 1..).next().map(|(id, _)| *id));
        Ok((page, next))
    }
}
