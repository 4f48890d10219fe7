//! Placeholder extraction, typing and substitution.
//!
//! Placeholders are bracketed names in one of several syntaxes. Tokens that
//! share a name are one logical variable: substitution replaces all of them.

mod extract;
mod format;
mod infer;
mod substitute;

pub use extract::{
    apply_schema, extract, extract_blocks, group_by_name, CONTEXT_CHARS, MAX_NAME_CHARS,
};
pub use format::{
    format_currency, format_date, format_percentage, format_value, parse_date, SubstitutionOptions,
};
pub use infer::infer_type;
pub use substitute::{
    missing_values, missing_values_with_schema, substitute, substitute_text, SubstitutionEngine,
    SubstitutionOutcome,
};
