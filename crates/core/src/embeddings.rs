use crate::error::EmbeddingError;
use crate::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dimension of the default offline embedder; must match the collection.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Text to fixed-dimension vector. Batch calls preserve input order and
/// count; `embed_query` uses the same model and parameters as `embed_batch`
/// so similarity comparisons stay meaningful.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            got: 0,
        })
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed_query(text).await
    }
}

/// Deterministic character-trigram hashing embedder, L2-normalized. Needs no
/// model files or network, which makes it the offline and test default.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl HashEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Client for an OpenAI-style `/embeddings` endpoint. Requests are wrapped in
/// the bounded-retry decorator; there is no other retry layer.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
        api_key: Option<&str>,
        retry: RetryPolicy,
    ) -> Result<Self, EmbeddingError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let bearer = format!("Bearer {}", key.trim());
            let value = HeaderValue::from_str(&bearer)
                .map_err(|error| EmbeddingError::Backend(format!("invalid api key: {error}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimensions,
            retry,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response: EmbeddingResponse = retry(self.retry, || async {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&EmbeddingRequest {
                    model: &self.model,
                    input: texts,
                })
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(EmbeddingError::Backend(format!(
                    "{} returned {}",
                    self.endpoint,
                    response.status()
                )));
            }

            Ok(response.json().await?)
        })
        .await?;

        let mut rows = response.data;
        rows.sort_by_key(|row| row.index);

        if rows.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: rows.len(),
            });
        }
        for row in &rows {
            if row.embedding.len() != self.dimensions {
                return Err(EmbeddingError::Dimension {
                    expected: self.dimensions,
                    got: row.embedding.len(),
                });
            }
        }

        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashEmbedder, HttpEmbedder};
    use crate::error::EmbeddingError;
    use crate::retry::RetryPolicy;

    #[tokio::test]
    async fn embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let first = embedder
            .embed_query("evaporation and the water cycle")
            .await
            .unwrap();
        let second = embedder
            .embed_query("evaporation and the water cycle")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn embedder_outputs_configured_dimension() {
        let embedder = HashEmbedder { dimensions: 32 };
        let vector = embedder.embed_query("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_count() {
        let embedder = HashEmbedder { dimensions: 16 };
        let texts = vec![
            "solid".to_string(),
            "liquid".to_string(),
            "gas".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), texts.len());
        assert_eq!(vectors[1], embedder.embed_query("liquid").await.unwrap());
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashEmbedder { dimensions: 64 };
        let vector = embedder.embed_query("states of matter").await.unwrap();
        let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreachable_service_is_an_error_not_a_panic() {
        let embedder = HttpEmbedder::new(
            "http://127.0.0.1:9",
            "all-MiniLM-L6-v2",
            8,
            None,
            RetryPolicy::none(),
        )
        .unwrap();

        let result = embedder.embed_batch(&["some text".to_string()]).await;
        assert!(matches!(result, Err(EmbeddingError::Http(_))));
    }
}
