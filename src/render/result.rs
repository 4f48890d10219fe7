//! Generation result with metadata.

use serde::{Deserialize, Serialize};

use super::OutputFormat;
use crate::error::Warning;
use crate::model::{is_wide_char, ContentBlock};

/// Which pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPath {
    /// Classified blocks were substituted and emitted
    #[default]
    Structured,
    /// A boilerplate template was substituted
    Fallback,
}

/// Summary of an emitted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Pages in the output
    pub page_count: u32,

    /// Words in the output text (each CJK character counts as one)
    pub word_count: u32,

    /// Logical variables that replaced at least one token
    pub variables_substituted: u32,

    /// Blocks emitted
    pub block_count: u32,
}

/// Result of one generate call.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    /// Whether `binary` holds a usable document
    pub success: bool,

    /// Output document bytes
    pub binary: Vec<u8>,

    /// Summary metadata
    pub metadata: GenerationMetadata,

    /// Hard error message, when `success` is false or the fallback path was forced
    pub error: Option<String>,

    /// Soft failures
    pub warnings: Vec<Warning>,

    /// Which path produced the output
    pub path: GenerationPath,

    /// MIME type of `binary`
    pub mime_type: String,
}

impl GenerationResult {
    /// A successful result.
    pub fn ok(binary: Vec<u8>, metadata: GenerationMetadata, format: OutputFormat) -> Self {
        Self {
            success: true,
            binary,
            metadata,
            error: None,
            warnings: Vec::new(),
            path: GenerationPath::Structured,
            mime_type: format.mime_type().to_string(),
        }
    }

    /// A failed result carrying only the error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Set the path and return self.
    pub fn with_path(mut self, path: GenerationPath) -> Self {
        self.path = path;
        self
    }

    /// Append warnings and return self.
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Output size in bytes.
    pub fn len(&self) -> usize {
        self.binary.len()
    }

    /// Whether no bytes were produced.
    pub fn is_empty(&self) -> bool {
        self.binary.is_empty()
    }
}

/// Count words: CJK characters individually, other scripts by whitespace-separated runs.
pub fn count_words(text: &str) -> u32 {
    let mut count = 0u32;
    let mut in_word = false;
    for c in text.chars() {
        if is_wide_char(c) {
            in_word = false;
            if c.is_alphanumeric() {
                count += 1;
            }
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word && c.is_alphanumeric() {
            count += 1;
            in_word = true;
        }
    }
    count
}

/// Words across all blocks.
pub fn count_block_words(blocks: &[ContentBlock]) -> u32 {
    blocks.iter().map(|b| count_words(&b.text)).sum()
}
