//! Persisted template state.

use serde::{Deserialize, Serialize};

use super::{ContentBlock, DocumentMetadata, LogicalVariable, SourceKind};
use crate::error::Result;
use crate::render::{to_json, JsonFormat};

/// Everything the generate phase needs, without re-parsing the upload.
///
/// The record store treats this as an opaque blob keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Template identifier assigned by the caller
    pub id: String,

    /// Which adapter produced the content
    pub source_kind: SourceKind,

    /// Extracted plain text
    pub raw_text: String,

    /// Semantic markup, when the source had it
    #[serde(default)]
    pub markup: Option<String>,

    /// Classified block sequence
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,

    /// Source metadata
    #[serde(default)]
    pub metadata: DocumentMetadata,

    /// Variables found in the template
    #[serde(default)]
    pub variables: Vec<LogicalVariable>,

    /// Page size in points of the first source page (fixed-layout only)
    #[serde(default)]
    pub page_size: Option<(f32, f32)>,
}

impl TemplateRecord {
    /// Create an empty record.
    pub fn new(id: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            source_kind,
            raw_text: String::new(),
            markup: None,
            blocks: Vec::new(),
            metadata: DocumentMetadata::default(),
            variables: Vec::new(),
            page_size: None,
        }
    }

    /// Whether any structured content was stored.
    pub fn has_structure(&self) -> bool {
        !self.blocks.is_empty() || !self.raw_text.trim().is_empty()
    }

    /// Serialize the record.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        to_json(self, format)
    }

    /// Restore a record serialized with [`TemplateRecord::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
