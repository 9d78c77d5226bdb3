use crate::classify::{classify, SpanStyle};
use crate::cleaning::TextCleaner;
use crate::error::ExtractionError;
use crate::models::{Block, Page};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Wire format for an extracted document: pages of span-annotated blocks, as
/// produced by a layout-aware PDF extraction step upstream of this pipeline.
#[derive(Debug, Deserialize)]
pub struct SourceDocument {
    pub pages: Vec<SourcePage>,
}

#[derive(Debug, Deserialize)]
pub struct SourcePage {
    pub page_number: u32,
    #[serde(default)]
    pub blocks: Vec<SourceBlock>,
}

#[derive(Debug, Deserialize)]
pub struct SourceBlock {
    #[serde(default)]
    pub bbox: Vec<f32>,
    #[serde(default)]
    pub lines: Vec<SourceLine>,
}

#[derive(Debug, Deserialize)]
pub struct SourceLine {
    #[serde(default)]
    pub spans: Vec<SourceSpan>,
}

#[derive(Debug, Deserialize)]
pub struct SourceSpan {
    pub text: String,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub flags: u32,
}

/// Yields cleaned, classified pages for a document path.
pub trait PageSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Page>, ExtractionError>;
}

/// Loads `SourceDocument` JSON files, cleans each block's text and classifies
/// it from the span font attributes.
pub struct JsonPageSource {
    cleaner: TextCleaner,
}

impl JsonPageSource {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            cleaner: TextCleaner::new()?,
        })
    }

    fn convert_page(&self, source: SourcePage) -> Page {
        let mut blocks = Vec::with_capacity(source.blocks.len());
        let mut raw_text = String::new();

        for block in source.blocks {
            let mut text = String::new();
            let mut styles = Vec::new();
            for line in &block.lines {
                for span in &line.spans {
                    text.push_str(&span.text);
                    styles.push(SpanStyle {
                        font_size: span.size,
                        flags: span.flags,
                    });
                }
                text.push('\n');
            }

            let cleaned = self.cleaner.clean(&text);
            if cleaned.is_empty() {
                continue;
            }
            if !raw_text.is_empty() {
                raw_text.push('\n');
            }
            raw_text.push_str(&cleaned);

            let kind = classify(&cleaned, &styles);
            blocks.push(Block {
                text: cleaned,
                kind,
                bbox: block.bbox,
            });
        }

        Page {
            number: source.page_number,
            raw_text,
            blocks,
        }
    }
}

impl PageSource for JsonPageSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Page>, ExtractionError> {
        let raw = std::fs::read_to_string(path)?;
        let document: SourceDocument = serde_json::from_str(&raw)?;

        let mut pages = Vec::with_capacity(document.pages.len());
        for source in document.pages {
            let number = source.page_number;
            let page = self.convert_page(source);
            if page.raw_text.is_empty() {
                warn!(path = %path.display(), page = number, "page has no extractable text, skipping");
                continue;
            }
            pages.push(page);
        }

        if pages.is_empty() {
            return Err(ExtractionError::NoText(path.display().to_string()));
        }

        debug!(path = %path.display(), pages = pages.len(), "loaded document");
        Ok(pages)
    }
}
