//! Placeholder and variable types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The kind of value a placeholder expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Free text, passed through verbatim
    #[default]
    Text,
    /// Monetary amount
    Currency,
    /// Calendar date
    Date,
    /// Ratio rendered with a percent sign
    Percentage,
}

/// Bracket syntax used to mark a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderSyntax {
    /// `[name]`
    Square,
    /// `{{name}}`
    DoubleCurly,
    /// `${name}`
    DollarCurly,
    /// `【name】`
    Lenticular,
    /// `［name］`
    FullwidthSquare,
}

impl PlaceholderSyntax {
    /// Every supported syntax.
    pub const ALL: [PlaceholderSyntax; 5] = [
        PlaceholderSyntax::DollarCurly,
        PlaceholderSyntax::DoubleCurly,
        PlaceholderSyntax::Square,
        PlaceholderSyntax::Lenticular,
        PlaceholderSyntax::FullwidthSquare,
    ];

    /// Opening and closing delimiters.
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            PlaceholderSyntax::Square => ("[", "]"),
            PlaceholderSyntax::DoubleCurly => ("{{", "}}"),
            PlaceholderSyntax::DollarCurly => ("${", "}"),
            PlaceholderSyntax::Lenticular => ("【", "】"),
            PlaceholderSyntax::FullwidthSquare => ("［", "］"),
        }
    }

    /// Render the canonical token for a logical name.
    pub fn token(self, name: &str) -> String {
        let (open, close) = self.delimiters();
        format!("{}{}{}", open, name, close)
    }
}

/// Where a placeholder occurrence was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderPosition {
    /// Character offset of the token start (within the block when `block_index` is set)
    pub offset: usize,
    /// Index of the containing block, when extracted from blocks
    pub block_index: Option<usize>,
}

/// One recognized placeholder token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePlaceholder {
    /// Exact matched token, e.g. `[甲方名称]`
    pub placeholder_text: String,

    /// Captured name, e.g. `甲方名称`
    pub logical_name: String,

    /// Type inferred from the name
    pub inferred_type: ValueType,

    /// Bracket syntax of the token
    pub syntax: PlaceholderSyntax,

    /// First occurrence
    pub position: PlaceholderPosition,

    /// Surrounding text of the first occurrence
    pub context: String,

    /// Whether a value must be supplied
    pub required: bool,
}

/// A logical variable: one name, possibly marked with several syntaxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalVariable {
    /// Canonical name
    pub name: String,

    /// Value type
    pub value_type: ValueType,

    /// Every literal token observed for this name
    pub placeholders: BTreeSet<String>,

    /// Whether a value must be supplied
    pub required: bool,
}

impl LogicalVariable {
    /// Create a variable with no observed tokens.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            placeholders: BTreeSet::new(),
            required: true,
        }
    }

    /// Canonical tokens for every syntax plus the observed ones.
    pub fn all_tokens(&self) -> BTreeSet<String> {
        let mut tokens: BTreeSet<String> = PlaceholderSyntax::ALL
            .iter()
            .map(|s| s.token(&self.name))
            .collect();
        tokens.extend(self.placeholders.iter().cloned());
        tokens
    }
}

/// Caller-side overrides for a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Override the inferred type
    pub value_type: Option<ValueType>,
    /// Override the required flag
    pub required: Option<bool>,
}

/// Caller-side overrides keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSchema {
    /// Field overrides
    pub fields: BTreeMap<String, SchemaField>,
}

impl VariableSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a field optional and return self.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.fields.entry(name.into()).or_default().required = Some(false);
        self
    }

    /// Force a field's type and return self.
    pub fn with_type(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.entry(name.into()).or_default().value_type = Some(value_type);
        self
    }

    /// Look up a field override.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.get(name)
    }
}

/// A caller-supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Raw value as entered
    pub value: String,
    /// Explicit type; `None` uses the type inferred from the name
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
}

impl VariableValue {
    /// A value whose type is inferred from the variable name.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value_type: None,
        }
    }

    /// A value with an explicit type.
    pub fn typed(value: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            value: value.into(),
            value_type: Some(value_type),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Values keyed by logical name.
pub type ValueMap = BTreeMap<String, VariableValue>;
