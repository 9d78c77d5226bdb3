use crate::chunking::TokenWindowChunker;
use crate::config::{ChunkMode, PipelineConfig};
use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, ExtractionError, IngestError};
use crate::metadata;
use crate::models::{Chunk, ChunkPayload, ChunkRecord, SearchFilter, Section};
use crate::segment::segment_blocks;
use crate::source::{JsonPageSource, PageSource};
use crate::traits::VectorStore;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of one file within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Indexed { chunks: usize },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
}

/// Summary of one folder ingestion run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub completed_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub total_chunks: usize,
}

impl BatchReport {
    pub fn indexed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|report| matches!(report.status, FileStatus::Indexed { .. }))
            .count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.len() - self.indexed_files()
    }
}

/// Finds ingestible documents under a folder, sorted for a stable run order.
pub fn discover_document_files(folder: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry.map_err(|error| {
            std::io::Error::new(std::io::ErrorKind::Other, error.to_string())
        })?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Drives one document from extracted pages to indexed points: segment,
/// chunk, tag, embed, upsert. Point ids are derived from the source file and
/// chunk index, and a file's previous points are deleted before the new ones
/// are written, so re-ingesting never duplicates and never strands stale
/// chunks.
pub struct IngestPipeline<S, E> {
    source: JsonPageSource,
    chunker: TokenWindowChunker,
    store: S,
    embedder: E,
    config: PipelineConfig,
}

impl<S: VectorStore, E: Embedder> IngestPipeline<S, E> {
    pub fn new(store: S, embedder: E, config: PipelineConfig) -> Result<Self, IngestError> {
        if embedder.dimensions() != store.dimension() {
            return Err(EmbeddingError::Dimension {
                expected: store.dimension(),
                got: embedder.dimensions(),
            }
            .into());
        }

        Ok(Self {
            source: JsonPageSource::new()?,
            chunker: TokenWindowChunker::new(config.chunking.window)?,
            store,
            embedder,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingests every document under `folder`, best effort: one failing file
    /// is recorded in the report and does not stop the batch.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<BatchReport, IngestError> {
        self.store.ensure_collection().await?;

        let files = discover_document_files(folder)?;
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no .json documents under {}",
                folder.display()
            )));
        }

        let mut reports = Vec::with_capacity(files.len());
        let mut total_chunks = 0;

        for path in files {
            let name = file_name(&path)?;
            match self.ingest_file(&path).await {
                Ok(chunks) => {
                    total_chunks += chunks;
                    reports.push(FileReport {
                        file: name,
                        status: FileStatus::Indexed { chunks },
                    });
                }
                Err(error) => {
                    warn!(file = %name, %error, "skipping file after ingest failure");
                    reports.push(FileReport {
                        file: name,
                        status: FileStatus::Failed {
                            message: error.to_string(),
                        },
                    });
                }
            }
        }

        let report = BatchReport {
            completed_at: Utc::now(),
            files: reports,
            total_chunks,
        };
        info!(
            indexed = report.indexed_files(),
            failed = report.failed_files(),
            chunks = report.total_chunks,
            "batch ingest finished"
        );
        Ok(report)
    }

    /// Ingests one document and returns the number of chunks written.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, IngestError> {
        let source_file = file_name(path)?;
        let pages = self.source.extract_pages(path)?;

        let blocks = pages.into_iter().flat_map(|page| page.blocks);
        let sections = segment_blocks(blocks, self.config.chunking.budget);
        let chunks = self.chunk_document(&source_file, &sections)?;
        if chunks.is_empty() {
            return Err(ExtractionError::NoText(source_file).into());
        }

        let records = self.embed_chunks(&source_file, chunks).await?;

        // Clear any points left from a previous ingest of this file; a
        // shrunken document would otherwise leave stale high-index points.
        self.store
            .delete(&SearchFilter::default().equals("source_file", source_file.clone()))
            .await?;
        self.store.upsert(&records).await?;

        info!(file = %source_file, chunks = records.len(), "indexed document");
        Ok(records.len())
    }

    fn chunk_document(
        &self,
        source_file: &str,
        sections: &[Section],
    ) -> Result<Vec<Chunk>, IngestError> {
        match self.config.chunking.mode {
            ChunkMode::Sections => Ok(section_chunks(sections)),
            ChunkMode::TokenWindows => {
                let text = flatten_sections(sections);
                let windows = self.chunker.windows(source_file, &text)?;
                Ok(windows
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| Chunk {
                        text,
                        section: None,
                        index,
                    })
                    .collect())
            }
        }
    }

    async fn embed_chunks(
        &self,
        source_file: &str,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<ChunkRecord>, IngestError> {
        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.embedding.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != self.store.dimension() {
                    return Err(EmbeddingError::Dimension {
                        expected: self.store.dimension(),
                        got: vector.len(),
                    }
                    .into());
                }

                let mut meta = metadata::tag(
                    source_file,
                    chunk.index,
                    &chunk.text,
                    self.config.difficulty_policy,
                );
                meta.section = chunk.section.clone();

                records.push(ChunkRecord {
                    id: point_id(source_file, chunk.index),
                    vector,
                    payload: ChunkPayload::new(chunk.text.clone(), &meta),
                });
            }
        }

        Ok(records)
    }
}

/// Per-section chunks: merged content passes through as-is, activities and
/// questions carry a labelling prefix. Indices run across the whole document.
fn section_chunks(sections: &[Section]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut index = 0usize;
    let mut push = |chunks: &mut Vec<Chunk>, text: String, section: &str| {
        chunks.push(Chunk {
            text,
            section: Some(section.to_string()),
            index,
        });
        index += 1;
    };

    for section in sections {
        for text in &section.content {
            push(&mut chunks, text.clone(), &section.title);
        }
        for text in &section.activities {
            push(&mut chunks, format!("Activity: {text}"), &section.title);
        }
        for text in &section.questions {
            push(&mut chunks, format!("Question: {text}"), &section.title);
        }
    }
    chunks
}

/// Whole-document text for token windowing: each section rendered as its
/// title followed by the merged lists, sections separated by blank lines.
fn flatten_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|section| {
            let mut parts = vec![section.title.clone()];
            parts.extend(section.content.iter().cloned());
            parts.extend(section.activities.iter().cloned());
            parts.extend(section.questions.iter().cloned());
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn file_name(path: &Path) -> Result<String, ExtractionError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ExtractionError::MissingFileName(path.display().to_string()))
}

/// First eight bytes of sha256(source_file, chunk_index), read big-endian.
/// Deterministic, so re-ingestion is idempotent via last write wins.
fn point_id(source_file: &str, chunk_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(source_file.as_bytes());
    hasher.update(chunk_index.to_be_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().unwrap_or_default())
}
