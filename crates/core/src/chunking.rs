use crate::error::ChunkingError;
use tiktoken_rs::CoreBPE;

/// Character budgets for the greedy section merge.
#[derive(Debug, Clone, Copy)]
pub struct CharBudget {
    pub target_chars: usize,
    pub min_chars: usize,
}

impl Default for CharBudget {
    fn default() -> Self {
        Self {
            target_chars: 2_000,
            min_chars: 200,
        }
    }
}

/// Greedy character-budget merge over one content list.
///
/// Items are space-joined into an accumulator; once adding the next item
/// would push past `target_chars` and the accumulator already holds more than
/// `min_chars`, the accumulator is flushed and the item starts a new chunk.
/// A single item longer than the target becomes its own chunk unsplit.
pub fn merge_by_budget(items: &[String], budget: CharBudget) -> Vec<String> {
    let mut merged = Vec::new();
    let mut current = String::new();

    for item in items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        if !current.is_empty()
            && current.len() + item.len() > budget.target_chars
            && current.len() > budget.min_chars
        {
            merged.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(item);
    }

    if !current.is_empty() {
        merged.push(current);
    }

    merged
}

/// Token budgets for full-document windowing.
#[derive(Debug, Clone, Copy)]
pub struct TokenWindow {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for TokenWindow {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 50,
        }
    }
}

/// Token-budget sliding window with sentence-boundary snapping and overlap,
/// applied to a full document's concatenated text.
pub struct TokenWindowChunker {
    bpe: CoreBPE,
    window: TokenWindow,
}

impl TokenWindowChunker {
    pub fn new(window: TokenWindow) -> Result<Self, ChunkingError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|error| ChunkingError::Tokenizer(error.to_string()))?;
        Ok(Self { bpe, window })
    }

    /// Splits `text` into chunks of at most `chunk_size` tokens. Non-final
    /// windows are trimmed back to the last complete sentence and re-encoded
    /// so the overlap advance reflects what the window actually consumed;
    /// the start index always moves forward by at least one token.
    pub fn windows(&self, document: &str, text: &str) -> Result<Vec<String>, ChunkingError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= self.window.chunk_size {
            return Ok(vec![text.to_string()]);
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < tokens.len() {
            let end = (start + self.window.chunk_size).min(tokens.len());
            let mut piece = self.decode(document, &tokens[start..end])?;
            let mut consumed = end - start;

            if end < tokens.len() {
                let fragments: Vec<&str> = piece.split('.').collect();
                if fragments.len() > 1 {
                    // Drop the trailing incomplete sentence and measure the
                    // shortened window in tokens.
                    piece = format!("{}.", fragments[..fragments.len() - 1].join("."));
                    consumed = self.bpe.encode_ordinary(&piece).len();
                }
            }

            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            // The window that reaches the end of the token stream is final;
            // stepping back by the overlap from it would only re-emit its
            // own suffix.
            if end == tokens.len() {
                break;
            }
            start += consumed.saturating_sub(self.window.overlap).max(1);
        }

        Ok(chunks)
    }

    /// Token count of `text` under the chunker's encoding.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn decode(&self, document: &str, tokens: &[u32]) -> Result<String, ChunkingError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|error| ChunkingError::Decode {
                document: document.to_string(),
                detail: error.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{merge_by_budget, CharBudget, TokenWindow, TokenWindowChunker};

    fn budget() -> CharBudget {
        CharBudget::default()
    }

    #[test]
    fn five_paragraphs_of_600_chars_merge_into_two_chunks() {
        let items: Vec<String> = (0..5).map(|_| "a".repeat(600)).collect();
        let merged = merge_by_budget(&items, budget());

        // 1802 + 600 crosses the 2000 target, so paragraphs 1-3 flush and
        // paragraphs 4-5 form the final chunk.
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].len(), 1_802);
        assert_eq!(merged[1].len(), 1_201);
    }

    #[test]
    fn single_oversize_item_passes_through_unsplit() {
        let items = vec!["b".repeat(5_000)];
        let merged = merge_by_budget(&items, budget());
        assert_eq!(merged, vec!["b".repeat(5_000)]);
    }

    #[test]
    fn short_items_merge_space_joined() {
        let items = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let merged = merge_by_budget(&items, budget());
        assert_eq!(merged, vec!["one two three".to_string()]);
    }

    #[test]
    fn empty_items_are_skipped() {
        let items = vec!["".to_string(), "  ".to_string(), "text".to_string()];
        let merged = merge_by_budget(&items, budget());
        assert_eq!(merged, vec!["text".to_string()]);
    }

    #[test]
    fn content_is_preserved_across_chunks() {
        let items: Vec<String> = (0..9).map(|i| format!("paragraph-{i} ").repeat(40)).collect();
        let merged = merge_by_budget(&items, budget());
        let joined = merged.join(" ");
        for item in &items {
            assert!(joined.contains(item.trim()));
        }
    }

    #[test]
    fn input_within_budget_is_one_unchanged_chunk() {
        let chunker = TokenWindowChunker::new(TokenWindow::default()).unwrap();
        let text = "Matter is made of small particles. The particles move constantly.";
        let chunks = chunker.windows("doc.json", text).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn input_of_exactly_chunk_size_tokens_is_one_chunk() {
        let text = "Evaporation causes cooling. Particles at the surface gain energy. ".repeat(8);
        let probe = TokenWindowChunker::new(TokenWindow::default()).unwrap();
        let exact = probe.count_tokens(&text);

        let chunker = TokenWindowChunker::new(TokenWindow {
            chunk_size: exact,
            overlap: 10,
        })
        .unwrap();
        let chunks = chunker.windows("doc.json", &text).unwrap();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn every_window_stays_within_the_token_budget() {
        let window = TokenWindow {
            chunk_size: 32,
            overlap: 8,
        };
        let chunker = TokenWindowChunker::new(window).unwrap();
        let text = "The water cycle moves water between land and sky. Evaporation lifts \
                    vapour from oceans. Condensation forms clouds. Precipitation returns \
                    water to the ground. Rivers carry it back to the sea. The cycle repeats \
                    endlessly through the seasons. Plants transpire moisture as well. "
            .repeat(4);

        let chunks = chunker.windows("doc.json", &text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunker.count_tokens(chunk) <= window.chunk_size);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn consecutive_windows_share_the_configured_overlap() {
        let window = TokenWindow {
            chunk_size: 24,
            overlap: 6,
        };
        let chunker = TokenWindowChunker::new(window).unwrap();
        // No sentence terminators, so no snapping: every non-final window
        // consumes exactly chunk_size tokens and advances by
        // chunk_size - overlap.
        let text = "solid liquid gas plasma energy particle atom molecule "
            .repeat(12)
            .trim_end()
            .to_string();
        let chunks = chunker.windows("doc.json", &text).unwrap();
        assert!(chunks.len() > 2);

        let bpe = tiktoken_rs::cl100k_base().unwrap();
        let tokens = bpe.encode_ordinary(&text);
        let stride = window.chunk_size - window.overlap;

        for (n, pair) in chunks.windows(2).enumerate() {
            let shared_start = (n + 1) * stride;
            let shared_end = n * stride + window.chunk_size;
            assert_eq!(shared_end - shared_start, window.overlap);

            let shared = bpe
                .decode(tokens[shared_start..shared_end].to_vec())
                .unwrap();
            let shared = shared.trim();
            assert!(!shared.is_empty());
            assert!(pair[0].ends_with(shared));
            assert!(pair[1].starts_with(shared));
        }
    }

    #[test]
    fn the_final_window_is_emitted_once() {
        let window = TokenWindow {
            chunk_size: 16,
            overlap: 4,
        };
        let chunker = TokenWindowChunker::new(window).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta ".repeat(6);
        let chunks = chunker.windows("doc.json", text.trim_end()).unwrap();

        // The last chunk must not reappear as a shrinking suffix of itself.
        let last = chunks.last().unwrap();
        assert_eq!(
            chunks
                .iter()
                .filter(|chunk| last.ends_with(chunk.as_str()))
                .count(),
            1
        );
    }

    #[test]
    fn windowing_terminates_even_when_overlap_swallows_the_window() {
        // Sentence snapping can shrink the consumed span below the overlap;
        // the advance still moves by at least one token.
        let window = TokenWindow {
            chunk_size: 12,
            overlap: 11,
        };
        let chunker = TokenWindowChunker::new(window).unwrap();
        let text = "Solids keep shape. Liquids flow. Gases expand. Plasma glows. ".repeat(6);
        let chunks = chunker.windows("doc.json", &text).unwrap();
        assert!(!chunks.is_empty());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = TokenWindowChunker::new(TokenWindow::default()).unwrap();
        assert!(chunker.windows("doc.json", "   ").unwrap().is_empty());
    }
}
