use crate::embeddings::Embedder;
use crate::error::RetrieveError;
use crate::models::{ContextBlock, ScoredPayload, SearchFilter, SearchResult};
use crate::traits::VectorStore;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Payload fields that may appear in a retrieval filter. Anything else is
/// dropped with a warning rather than failing the query.
pub const FILTERABLE_FIELDS: [&str; 5] =
    ["chapter", "subject", "difficulty", "source_file", "section"];

/// Filtered semantic search over a vector store, sharing the embedder used at
/// ingestion time so query and chunk vectors stay comparable.
pub struct Retriever<S, E> {
    store: S,
    embedder: E,
}

impl<S: VectorStore, E: Embedder> Retriever<S, E> {
    pub fn new(store: S, embedder: E) -> Self {
        Self { store, embedder }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        filters: &HashMap<String, String>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RetrieveError> {
        let vector = self.embedder.embed_query(query).await?;
        let filter = translate_filters(filters);

        let hits = self.store.search(&vector, top_k, &filter).await?;
        debug!(query, hits = hits.len(), "retrieved chunks");

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                text: hit.payload.text,
                score: hit.score,
                chapter: hit.payload.chapter,
                subject: hit.payload.subject,
                difficulty: hit.payload.difficulty,
                source_file: hit.payload.source_file,
            })
            .collect())
    }

    /// Retrieves and formats a ready-to-prompt context block for a topic.
    pub async fn context_for(
        &self,
        topic: &str,
        filters: &HashMap<String, String>,
        top_k: usize,
    ) -> Result<ContextBlock, RetrieveError> {
        let vector = self.embedder.embed_query(topic).await?;
        let filter = translate_filters(filters);
        let hits = self.store.search(&vector, top_k, &filter).await?;
        Ok(build_context(topic, &hits))
    }
}

/// Keeps recognized fields, in sorted key order so the resulting filter is
/// deterministic regardless of map iteration order.
pub fn translate_filters(filters: &HashMap<String, String>) -> SearchFilter {
    let mut keys: Vec<&String> = filters.keys().collect();
    keys.sort();

    let mut filter = SearchFilter::default();
    for key in keys {
        if FILTERABLE_FIELDS.contains(&key.as_str()) {
            filter = filter.equals(key.clone(), filters[key].clone());
        } else {
            warn!(field = %key, "ignoring unknown filter field");
        }
    }
    filter
}

/// Renders ranked hits under a topic header. Chapters and sources are
/// deduplicated in first-seen order.
pub fn build_context(topic: &str, hits: &[ScoredPayload]) -> ContextBlock {
    if hits.is_empty() {
        return ContextBlock {
            text: "No relevant educational content found for this topic.".to_string(),
            chapters: Vec::new(),
            sources: Vec::new(),
        };
    }

    let mut text = format!(
        "EDUCATIONAL CONTEXT FOR: {}\n{}\n",
        topic.to_uppercase(),
        "=".repeat(50)
    );
    let mut chapters: Vec<String> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    for (rank, hit) in hits.iter().enumerate() {
        let payload = &hit.payload;
        text.push_str(&format!(
            "\n[REFERENCE {}] {} - {} ({})\n",
            rank + 1,
            payload.chapter,
            payload.subject,
            payload.difficulty
        ));
        text.push_str(&format!("Relevance Score: {:.2}\n", hit.score));
        text.push_str(&format!("Source: {}\n", payload.source_file));
        text.push_str(&format!("Content: {}\n", payload.text));
        text.push_str(&"-".repeat(40));
        text.push('\n');

        if !chapters.contains(&payload.chapter) {
            chapters.push(payload.chapter.clone());
        }
        if !sources.contains(&payload.source_file) {
            sources.push(payload.source_file.clone());
        }
    }

    ContextBlock {
        text,
        chapters,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_context, translate_filters, Retriever};
    use crate::embeddings::{Embedder, HashEmbedder};
    use crate::models::{ChunkPayload, ChunkRecord, Difficulty, ScoredPayload, SearchFilter};
    use crate::stores::MemoryStore;
    use crate::traits::VectorStore;
    use std::collections::HashMap;

    fn payload(text: &str, chapter: &str, source: &str) -> ChunkPayload {
        ChunkPayload {
            text: text.to_string(),
            chapter: chapter.to_string(),
            subject: "Science".to_string(),
            difficulty: Difficulty::Basic,
            source_file: source.to_string(),
            chunk_index: 0,
            section: None,
        }
    }

    #[test]
    fn unknown_filter_fields_are_dropped() {
        let mut filters = HashMap::new();
        filters.insert("chapter".to_string(), "Chapter 2".to_string());
        filters.insert("grade".to_string(), "9".to_string());

        let filter = translate_filters(&filters);
        assert_eq!(
            filter,
            SearchFilter::default().equals("chapter", "Chapter 2")
        );
    }

    #[test]
    fn filter_translation_is_deterministic() {
        let mut filters = HashMap::new();
        filters.insert("subject".to_string(), "Science".to_string());
        filters.insert("chapter".to_string(), "Chapter 1".to_string());
        filters.insert("difficulty".to_string(), "Basic".to_string());

        let filter = translate_filters(&filters);
        let keys: Vec<&str> = filter.must.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["chapter", "difficulty", "subject"]);
    }

    #[test]
    fn context_formats_references_and_dedups_sources() {
        let hits = vec![
            ScoredPayload {
                payload: payload("Solids keep shape.", "Chapter 1", "science.json"),
                score: 0.91,
            },
            ScoredPayload {
                payload: payload("Liquids flow.", "Chapter 1", "science.json"),
                score: 0.85,
            },
        ];

        let context = build_context("states of matter", &hits);
        assert!(context.text.starts_with("EDUCATIONAL CONTEXT FOR: STATES OF MATTER"));
        assert!(context.text.contains("[REFERENCE 1] Chapter 1 - Science (Basic)"));
        assert!(context.text.contains("Relevance Score: 0.91"));
        assert!(context.text.contains("[REFERENCE 2]"));
        assert_eq!(context.chapters, vec!["Chapter 1".to_string()]);
        assert_eq!(context.sources, vec!["science.json".to_string()]);
    }

    #[test]
    fn empty_hits_give_the_fallback_message() {
        let context = build_context("anything", &[]);
        assert_eq!(
            context.text,
            "No relevant educational content found for this topic."
        );
        assert!(context.chapters.is_empty());
    }

    #[tokio::test]
    async fn retrieval_matches_ingested_content() {
        let embedder = HashEmbedder { dimensions: 64 };
        let store = MemoryStore::new(64);

        let texts = [
            ("Evaporation turns liquid water into vapour.", "Chapter 1"),
            ("Photosynthesis happens in leaves.", "Chapter 6"),
        ];
        let mut records = Vec::new();
        for (i, (text, chapter)) in texts.iter().enumerate() {
            records.push(ChunkRecord {
                id: i as u64,
                vector: embedder.embed_query(text).await.unwrap(),
                payload: payload(text, chapter, "science.json"),
            });
        }
        store.upsert(&records).await.unwrap();

        let retriever = Retriever::new(store, embedder);
        let results = retriever
            .retrieve("evaporation of water", &HashMap::new(), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chapter, "Chapter 1");
    }
}
