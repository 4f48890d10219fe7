//! Ingestion adapters.
//!
//! One adapter per source kind turns uploaded bytes into a [`ParsedDocument`]:
//! [`DocxAdapter`] for flowed documents and [`PdfAdapter`] for fixed-layout ones.

mod docx;
mod layout;
mod options;
mod pdf_parser;
mod snapshot;
mod table_detector;

pub use docx::{
    DocxAdapter, SourceStyle, PAGE_BREAK_CHAR, PAGE_BREAK_MARKUP, STYLE_MARKUP_PREFIX,
};
pub use layout::{
    group_into_lines, lines_to_text, ImagePlacement, LayoutAnalyzer, PageLayout, RuleLine,
    TextLine, COLUMN_GAP,
};
pub use options::{ErrorMode, IngestOptions, PageSelection};
#[cfg(test)]
pub(crate) use pdf_parser::fixtures;
pub use pdf_parser::PdfAdapter;
pub use snapshot::{horizontal_rule_rows, SnapshotBatch, SnapshotJob, SnapshotRenderer};
pub use table_detector::{TableDetector, TableDetectorConfig, TableEvidence, TablePattern};

use crate::error::{Result, Warning};
use crate::model::{ParsedDocument, SourceKind};

/// The output of one adapter call.
#[derive(Debug, Clone)]
pub struct Ingestion {
    /// The normalized document
    pub document: ParsedDocument,
    /// Soft failures met while parsing
    pub warnings: Vec<Warning>,
}

/// Turns raw bytes of one source kind into a [`ParsedDocument`].
///
/// Implementations hold only immutable configuration, so one adapter can
/// serve concurrent requests.
pub trait IngestionAdapter: Send + Sync {
    /// The kind of source this adapter reads.
    fn source_kind(&self) -> SourceKind;

    /// Short adapter name used in logs.
    fn name(&self) -> &str;

    /// Parse `bytes`. `file_name` is informational.
    ///
    /// Hard failures are `UnsupportedFormat`/`CorruptInput` errors. Empty text
    /// is an `EmptyContent` error in strict mode and a warning otherwise.
    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<Ingestion>;
}
