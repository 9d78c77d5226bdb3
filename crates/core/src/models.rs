use serde::{Deserialize, Serialize};
use std::fmt;

/// One rendered page handed to the pipeline by a page+span source.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub raw_text: String,
    pub blocks: Vec<Block>,
}

/// A classified text block. The bounding box is carried through untouched.
#[derive(Debug, Clone)]
pub struct Block {
    pub text: String,
    pub kind: BlockType,
    pub bbox: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading,
    ChapterTitle,
    Activity,
    Question,
    FigureCaption,
    TableCaption,
    BodyText,
}

impl BlockType {
    /// Heading-like blocks open a new section.
    pub fn opens_section(self) -> bool {
        matches!(self, BlockType::Heading | BlockType::ChapterTitle)
    }
}

/// A titled grouping of text between two headings. The three lists hold the
/// character-budget merged strings once the section has been closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub kind: BlockType,
    pub content: Vec<String>,
    pub activities: Vec<String>,
    pub questions: Vec<String>,
}

/// A bounded span of text prepared for embedding, positioned among its
/// siblings by `index`.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub section: Option<String>,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Basic => f.write_str("Basic"),
            Difficulty::Intermediate => f.write_str("Intermediate"),
            Difficulty::Advanced => f.write_str("Advanced"),
        }
    }
}

/// Retrieval metadata attached 1:1 to a chunk at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMetadata {
    pub chapter: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub source_file: String,
    pub chunk_index: usize,
    pub section: Option<String>,
}

/// Durable payload stored next to each vector; the only artifact this
/// pipeline persists. Never mutated after the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub chapter: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub source_file: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl ChunkPayload {
    pub fn new(text: impl Into<String>, metadata: &ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            chapter: metadata.chapter.clone(),
            subject: metadata.subject.clone(),
            difficulty: metadata.difficulty,
            source_file: metadata.source_file.clone(),
            chunk_index: metadata.chunk_index,
            section: metadata.section.clone(),
        }
    }
}

/// One point written to the vector index. Ids are caller-assigned integers;
/// rewriting an id overwrites the previous record.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A payload returned by similarity search, higher score first.
#[derive(Debug, Clone)]
pub struct ScoredPayload {
    pub payload: ChunkPayload,
    pub score: f32,
}

/// Equality conjunction over named payload fields. Empty means unrestricted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub must: Vec<(String, String)>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push((field.into(), value.into()));
        self
    }
}

/// A single retrieval hit handed to consumers; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub score: f32,
    pub chapter: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub source_file: String,
}

/// Assembled context for a downstream generation consumer: ranked chunk
/// texts under source headers plus the contributing chapters and sources.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    pub text: String,
    pub chapters: Vec<String>,
    pub sources: Vec<String>,
}
