//! Error and warning types for retemplate.
//!
//! Hard failures are [`Error`] values and abort the pipeline. Soft failures are
//! [`Warning`] values and travel next to a best-effort result.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for retemplate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting or regenerating a template.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is neither a flowed (DOCX) nor a fixed-layout (PDF) document.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The binary was recognized but could not be read.
    #[error("Corrupt input: {0}")]
    CorruptInput(String),

    /// The document was readable but no text could be extracted.
    #[error("Document contains no extractable text")]
    EmptyContent,

    /// Error while producing the output document.
    #[error("Emission error: {0}")]
    Emission(String),

    /// Error (de)serializing a persisted template record.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must abort the pipeline.
    ///
    /// `EmptyContent` is soft: the caller may continue with zero blocks.
    pub fn is_hard(&self) -> bool {
        !matches!(self, Error::EmptyContent)
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => {
                Error::CorruptInput("encrypted PDF documents are not supported".to_string())
            }
            _ => Error::CorruptInput(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::CorruptInput(format!("invalid DOCX container: {}", err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::CorruptInput(format!("malformed document XML: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A soft failure recorded alongside a best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Ingestion produced no text; processing continued with zero blocks.
    EmptyContent,

    /// The classifier could not recognize meaningful structure.
    ClassificationDegraded {
        /// Why the classification is considered degraded
        reason: String,
    },

    /// A required placeholder still appears after substitution.
    MissingRequiredValue {
        /// Logical variable name
        name: String,
        /// Literal placeholder tokens left in the output
        placeholders: Vec<String>,
    },

    /// One block did not render cleanly and was degraded.
    EmissionPartialFailure {
        /// Index of the block in the emitted sequence
        block_index: usize,
        /// What went wrong
        reason: String,
    },

    /// A page snapshot exceeded its wall-clock budget.
    PageRenderTimeout {
        /// Page number (1-indexed)
        page: u32,
        /// Budget that was exceeded, in milliseconds
        budget_ms: u64,
    },

    /// A page snapshot failed for a reason other than time.
    PageRenderFailed {
        /// Page number (1-indexed)
        page: u32,
        /// Failure description
        reason: String,
    },

    /// A page's content could not be decoded; it contributes no text.
    PageUnreadable {
        /// Page number (1-indexed)
        page: u32,
        /// Failure description
        reason: String,
    },

    /// Structured ingestion failed and the boilerplate path was used instead.
    IngestionFallback {
        /// The hard error that triggered the fallback
        reason: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyContent => write!(f, "document contains no extractable text"),
            Warning::ClassificationDegraded { reason } => {
                write!(f, "classification degraded: {}", reason)
            }
            Warning::MissingRequiredValue { name, placeholders } => write!(
                f,
                "missing value for '{}' ({})",
                name,
                placeholders.join(", ")
            ),
            Warning::EmissionPartialFailure {
                block_index,
                reason,
            } => write!(f, "block {} degraded during emission: {}", block_index, reason),
            Warning::PageRenderTimeout { page, budget_ms } => {
                write!(f, "page {} snapshot exceeded {} ms", page, budget_ms)
            }
            Warning::PageRenderFailed { page, reason } => {
                write!(f, "page {} snapshot failed: {}", page, reason)
            }
            Warning::PageUnreadable { page, reason } => {
                write!(f, "page {} could not be read: {}", page, reason)
            }
            Warning::IngestionFallback { reason } => {
                write!(f, "fell back to boilerplate template: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedFormat("legacy .doc".to_string());
        assert_eq!(err.to_string(), "Unsupported format: legacy .doc");

        let err = Error::EmptyContent;
        assert_eq!(err.to_string(), "Document contains no extractable text");
    }

    #[test]
    fn test_hard_errors() {
        assert!(Error::CorruptInput("x".into()).is_hard());
        assert!(Error::UnsupportedFormat("x".into()).is_hard());
        assert!(!Error::EmptyContent.is_hard());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = Warning::PageRenderTimeout {
            page: 3,
            budget_ms: 2000,
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"kind\":\"page_render_timeout\""));
        assert_eq!(warning.to_string(), "page 3 snapshot exceeded 2000 ms");
    }
}
