//! Data model shared by every pipeline stage.
//!
//! Ingestion produces a [`ParsedDocument`], the classifier turns it into an
//! ordered sequence of [`ContentBlock`]s, and the variable layer describes the
//! placeholders found in those blocks. Everything here is plain data and
//! serializable so a [`TemplateRecord`] can be persisted between the parse and
//! generate phases.

mod block;
mod document;
mod page;
mod placeholder;
mod table;
mod template;

pub use block::{Alignment, BlockPosition, BlockStyle, BlockType, ContentBlock};
pub use document::{DocumentMetadata, ParsedDocument, SourceKind};
pub use page::{PageContent, TextFragment};
pub(crate) use page::is_wide_char;
pub use placeholder::{
    LogicalVariable, PlaceholderPosition, PlaceholderSyntax, SchemaField, ValueMap, ValueType,
    VariablePlaceholder, VariableSchema, VariableValue,
};
pub use table::{Table, TableCell, TableRow};
pub use template::TemplateRecord;
