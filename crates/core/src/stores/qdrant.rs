use crate::config::{Distance, IndexConfig};
use crate::error::IndexError;
use crate::models::{ChunkPayload, ChunkRecord, ScoredPayload, SearchFilter};
use crate::retry::{retry, RetryPolicy};
use crate::traits::{StoredPoint, VectorStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const BACKEND: &str = "qdrant";

/// Points per upsert request. Qdrant accepts much larger bodies but smaller
/// batches keep a failed retry cheap.
const UPSERT_BATCH: usize = 100;

/// Vector index backed by Qdrant's REST API.
pub struct QdrantStore {
    client: Client,
    endpoint: String,
    collection: String,
    dimension: usize,
    distance: Distance,
    retry: RetryPolicy,
}

impl QdrantStore {
    pub fn new(config: &IndexConfig, dimension: usize, retry: RetryPolicy) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            dimension,
            distance: config.distance,
            retry,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    async fn create_collection(&self) -> Result<(), IndexError> {
        let body = json!({
            "vectors": {
                "size": self.dimension,
                "distance": self.distance.as_str(),
            }
        });

        let response = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!(
            collection = %self.collection,
            dimension = self.dimension,
            "created collection"
        );
        Ok(())
    }

    async fn existing_dimension(&self) -> Result<Option<usize>, IndexError> {
        let response = self.client.get(self.collection_url()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body: Value = response.json().await?;
        let size = body
            .pointer("/result/config/params/vectors/size")
            .and_then(Value::as_u64)
            .ok_or_else(|| IndexError::Backend {
                backend: BACKEND.to_string(),
                details: "collection info is missing the vector size".to_string(),
            })?;
        Ok(Some(size as usize))
    }
}

/// Renders an equality filter as Qdrant's `must` match clauses. An empty
/// filter renders to `None`, meaning unrestricted search.
pub fn filter_to_json(filter: &SearchFilter) -> Option<Value> {
    if filter.is_empty() {
        return None;
    }
    let clauses: Vec<Value> = filter
        .must
        .iter()
        .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
        .collect();
    Some(json!({ "must": clauses }))
}

async fn backend_error(response: reqwest::Response) -> IndexError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    IndexError::Backend {
        backend: BACKEND.to_string(),
        details: format!("{status}: {body}"),
    }
}

fn parse_payload(value: Value) -> Result<ChunkPayload, IndexError> {
    serde_json::from_value(value).map_err(IndexError::Serialization)
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_collection(&self) -> Result<(), IndexError> {
        match self.existing_dimension().await? {
            None => self.create_collection().await,
            Some(existing) if existing == self.dimension => {
                debug!(collection = %self.collection, "collection already exists");
                Ok(())
            }
            Some(existing) => Err(IndexError::DimensionMismatch {
                collection: self.collection.clone(),
                existing,
                configured: self.dimension,
            }),
        }
    }

    async fn recreate_collection(&self) -> Result<(), IndexError> {
        // Not atomic; searches between the delete and the create see a
        // missing or empty collection.
        let response = self.client.delete(self.collection_url()).send().await?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response).await);
        }
        self.create_collection().await
    }

    async fn upsert(&self, records: &[ChunkRecord]) -> Result<(), IndexError> {
        let url = format!("{}/points?wait=true", self.collection_url());

        for batch in records.chunks(UPSERT_BATCH) {
            let points: Vec<Value> = batch
                .iter()
                .map(|record| {
                    Ok(json!({
                        "id": record.id,
                        "vector": record.vector,
                        "payload": serde_json::to_value(&record.payload)?,
                    }))
                })
                .collect::<Result<_, serde_json::Error>>()?;
            let body = json!({ "points": points });

            retry(self.retry, || async {
                let response = self.client.put(&url).json(&body).send().await?;
                if !response.status().is_success() {
                    return Err(backend_error(response).await);
                }
                Ok(())
            })
            .await?;

            debug!(points = batch.len(), collection = %self.collection, "upserted batch");
        }

        Ok(())
    }

    async fn delete(&self, filter: &SearchFilter) -> Result<(), IndexError> {
        let url = format!("{}/points/delete?wait=true", self.collection_url());
        let clauses = filter_to_json(filter).unwrap_or_else(|| json!({ "must": [] }));
        let body = json!({ "filter": clauses });

        retry(self.retry, || async {
            let response = self.client.post(&url).json(&body).send().await?;
            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPayload>, IndexError> {
        let url = format!("{}/points/search", self.collection_url());
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(clauses) = filter_to_json(filter) {
            body["filter"] = clauses;
        }

        let response = retry(self.retry, || async {
            let response = self.client.post(&url).json(&body).send().await?;
            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }
            Ok(response.json::<Value>().await?)
        })
        .await?;

        let hits = response
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(hits.len());
        for mut hit in hits {
            let score = hit
                .get("score")
                .and_then(Value::as_f64)
                .unwrap_or_default() as f32;
            let payload = hit
                .get_mut("payload")
                .map(Value::take)
                .ok_or_else(|| IndexError::Backend {
                    backend: BACKEND.to_string(),
                    details: "search hit without payload".to_string(),
                })?;
            results.push(ScoredPayload {
                payload: parse_payload(payload)?,
                score,
            });
        }
        Ok(results)
    }

    async fn count(&self) -> Result<u64, IndexError> {
        let url = format!("{}/points/count", self.collection_url());
        let response = self
            .client
            .post(&url)
            .json(&json!({ "exact": true }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body: Value = response.json().await?;
        body.pointer("/result/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| IndexError::Backend {
                backend: BACKEND.to_string(),
                details: "count response is missing /result/count".to_string(),
            })
    }

    async fn scroll(
        &self,
        offset: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<StoredPoint>, Option<u64>), IndexError> {
        let url = format!("{}/points/scroll", self.collection_url());
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": true,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body: Value = response.json().await?;
        let next = body
            .pointer("/result/next_page_offset")
            .and_then(Value::as_u64);
        let raw_points = body
            .pointer("/result/points")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut points = Vec::with_capacity(raw_points.len());
        for mut raw in raw_points {
            let id = raw
                .get("id")
                .and_then(Value::as_u64)
                .ok_or_else(|| IndexError::Backend {
                    backend: BACKEND.to_string(),
                    details: "scroll point without integer id".to_string(),
                })?;
            let vector = raw
                .get_mut("vector")
                .map(Value::take)
                .and_then(|value| serde_json::from_value::<Vec<f32>>(value).ok());
            let payload = raw
                .get_mut("payload")
                .map(Value::take)
                .ok_or_else(|| IndexError::Backend {
                    backend: BACKEND.to_string(),
                    details: "scroll point without payload".to_string(),
                })?;
            points.push(StoredPoint {
                id,
                vector,
                payload: parse_payload(payload)?,
            });
        }

        Ok((points, next))
    }
}

#[cfg(test)]
mod tests {
    use super::filter_to_json;
    use crate::models::SearchFilter;
    use serde_json::json;

    #[test]
    fn empty_filter_renders_to_none() {
        assert_eq!(filter_to_json(&SearchFilter::default()), None);
    }

    #[test]
    fn filter_renders_match_clauses() {
        let filter = SearchFilter::default()
            .equals("chapter", "Chapter 3")
            .equals("subject", "Science");

        let value = filter_to_json(&filter).unwrap();
        assert_eq!(
            value,
            json!({
                "must": [
                    { "key": "chapter", "match": { "value": "Chapter 3" } },
                    { "key": "subject", "match": { "value": "Science" } },
                ]
            })
        );
    }
}
