//! Document-level types.

use serde::{Deserialize, Serialize};

use super::PageContent;

/// How the source document lays out its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Word-processor document whose content reflows (DOCX)
    Flowed,
    /// Paginated document pinned to page coordinates (PDF)
    FixedLayout,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Flowed => write!(f, "flowed"),
            SourceKind::FixedLayout => write!(f, "fixed-layout"),
        }
    }
}

/// The normalized result of one ingestion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Which adapter produced this document
    pub source_kind: SourceKind,

    /// Original file name as declared by the caller
    pub file_name: String,

    /// Plain text, one logical line per paragraph or table row.
    /// Explicit page breaks are encoded as form feed (`\x0C`) lines.
    pub raw_text: String,

    /// Semantic markup (headings, tables) when the source carries it
    pub markup: Option<String>,

    /// Per-page content
    pub pages: Vec<PageContent>,

    /// Document metadata
    pub metadata: DocumentMetadata,
}

impl ParsedDocument {
    /// Create an empty document of the given kind.
    pub fn new(source_kind: SourceKind, file_name: impl Into<String>) -> Self {
        Self {
            source_kind,
            file_name: file_name.into(),
            raw_text: String::new(),
            markup: None,
            pages: Vec::new(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&PageContent> {
        if page_num == 0 {
            return None;
        }
        self.pages.get((page_num - 1) as usize)
    }

    /// Whether any text was extracted.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Total number of pages (estimated for flowed documents)
    pub page_count: u32,

    /// Whether images were found (best effort)
    pub has_images: bool,

    /// Whether tables were found (best effort)
    pub has_tables: bool,
}
