//! # retemplate
//!
//! Contract template structure recovery and format-preserving regeneration.
//!
//! Uploaded DOCX and PDF templates are normalized into a common document
//! model, classified line by line into titles, headers, clauses, paragraphs
//! and table rows, and scanned for bracketed placeholders. Supplying values
//! regenerates a DOCX (or plain text) document in the original structure.
//!
//! ## Quick Start
//!
//! ```no_run
//! use retemplate::{TemplateEngine, GenerationOptions, ValueMap, VariableValue};
//!
//! fn main() -> retemplate::Result<()> {
//!     let engine = TemplateEngine::new();
//!     let outcome = engine.ingest_path("lease.pdf")?;
//!     for variable in &outcome.variables {
//!         println!("{} ({:?})", variable.name, variable.value_type);
//!     }
//!
//!     let mut values = ValueMap::new();
//!     values.insert("月租金".to_string(), VariableValue::new("3500"));
//!     let result = engine.generate(Some(&outcome.record), &values, &GenerationOptions::default());
//!     std::fs::write("lease-filled.docx", &result.binary)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two source kinds**: flowed (DOCX) and fixed-layout (PDF) ingestion
//! - **Heuristic classification**: rule cascade tuned for Chinese contracts
//! - **Placeholder syntaxes**: `[x]`, `{{x}}`, `${x}`, `【x】`, `［x］`
//! - **Typed formatting**: currency, date and percentage values
//! - **Parallel page snapshots**: bounded workers with a per-page budget
//! - **Boilerplate fallback**: keyword-matched templates when parsing yields nothing

pub mod classify;
pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod variable;

// Re-export commonly used types
pub use classify::{ClassifierConfig, Classification, LayoutClassifier};
pub use convert::{AdapterRegistry, BoilerplateKind, IngestOutcome, TemplateEngine};
pub use detect::{detect_source_kind, mime_type};
pub use error::{Error, Result, Warning};
pub use model::{
    Alignment, BlockStyle, BlockType, ContentBlock, LogicalVariable, ParsedDocument,
    PlaceholderSyntax, SourceKind, TemplateRecord, ValueMap, ValueType, VariablePlaceholder,
    VariableSchema, VariableValue,
};
pub use parser::{ErrorMode, IngestOptions, PageSelection};
pub use render::{
    GenerationMetadata, GenerationOptions, GenerationPath, GenerationResult, JsonFormat,
    OutputFormat, PageMargins,
};
pub use variable::{SubstitutionEngine, SubstitutionOptions};

use std::path::Path;

/// Parse a template file with default options.
///
/// # Example
///
/// ```no_run
/// use retemplate::parse_file;
///
/// let outcome = parse_file("contract.docx").unwrap();
/// println!("{} blocks", outcome.record.blocks.len());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<IngestOutcome> {
    TemplateEngine::new().ingest_path(path)
}

/// Parse template bytes with default options.
///
/// `file_name` is used for format messages and as the record id.
pub fn parse_bytes(data: &[u8], file_name: &str) -> Result<IngestOutcome> {
    TemplateEngine::new().ingest(data, file_name)
}

/// Parse template bytes with custom ingest options.
pub fn parse_bytes_with_options(
    data: &[u8],
    file_name: &str,
    options: IngestOptions,
) -> Result<IngestOutcome> {
    TemplateEngine::new()
        .with_ingest_options(options)
        .ingest(data, file_name)
}

/// List the logical variables of a template file.
///
/// # Example
///
/// ```no_run
/// use retemplate::list_variables;
///
/// for variable in list_variables("contract.pdf").unwrap() {
///     println!("{}: {:?}", variable.name, variable.placeholders);
/// }
/// ```
pub fn list_variables<P: AsRef<Path>>(path: P) -> Result<Vec<LogicalVariable>> {
    Ok(parse_file(path)?.variables)
}

/// Fill a template file and return the generated document.
///
/// Ingestion failures fall back to a boilerplate chosen from the file name;
/// the result then carries the error and an `IngestionFallback` warning.
pub fn fill_file<P: AsRef<Path>>(
    path: P,
    values: &ValueMap,
    options: &GenerationOptions,
) -> Result<GenerationResult> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(TemplateEngine::new().generate_from_upload(&data, file_name, values, options))
}

/// Substitute values into plain text with default formatting.
///
/// # Example
///
/// ```
/// use retemplate::{fill_text, ValueMap, VariableValue, ValueType};
///
/// let mut values = ValueMap::new();
/// values.insert("合同金额".to_string(), VariableValue::typed("280000", ValueType::Currency));
/// assert_eq!(fill_text("金额：{{合同金额}}", &values), "金额：280,000.00");
/// ```
pub fn fill_text(text: &str, values: &ValueMap) -> String {
    variable::substitute_text(text, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes_rejects_legacy_doc() {
        let ole = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0];
        let err = parse_bytes(&ole, "old.doc").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_fill_text_keeps_missing_placeholders() {
        let mut values = ValueMap::new();
        values.insert("甲方".to_string(), VariableValue::new("A公司"));
        assert_eq!(fill_text("[甲方]与[乙方]", &values), "A公司与[乙方]");
    }
}
