//! Value substitution.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::{Captures, Regex};

use super::extract::{apply_schema, extract_blocks, group_by_name};
use super::format::{format_value, SubstitutionOptions};
use super::infer::infer_type;
use crate::error::Warning;
use crate::model::{
    ContentBlock, LogicalVariable, PlaceholderSyntax, ValueMap, VariableSchema, VariableValue,
};

/// Result of one substitution pass.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionOutcome {
    /// Blocks with placeholders replaced, same count and order as the input
    pub blocks: Vec<ContentBlock>,
    /// Logical names that replaced at least one token
    pub replaced: BTreeSet<String>,
    /// Total number of token occurrences replaced
    pub replacement_count: usize,
}

/// Replaces placeholder tokens with formatted values.
///
/// Every syntax variant of a logical name is replaced, plus any literal
/// tokens registered with [`SubstitutionEngine::with_aliases`].
#[derive(Debug, Clone, Default)]
pub struct SubstitutionEngine {
    options: SubstitutionOptions,
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl SubstitutionEngine {
    /// Create an engine with the given formatting options.
    pub fn new(options: SubstitutionOptions) -> Self {
        Self {
            options,
            aliases: BTreeMap::new(),
        }
    }

    /// Register observed literal tokens, e.g. `{{ 合同金额 }}`.
    pub fn with_aliases(mut self, variables: &[LogicalVariable]) -> Self {
        for variable in variables {
            self.aliases
                .entry(variable.name.clone())
                .or_default()
                .extend(variable.placeholders.iter().cloned());
        }
        self
    }

    /// Formatting options in use.
    pub fn options(&self) -> &SubstitutionOptions {
        &self.options
    }

    /// Format a value using its explicit type or the type inferred from `name`.
    pub fn format(&self, name: &str, value: &VariableValue) -> String {
        let value_type = value.value_type.unwrap_or_else(|| infer_type(name));
        format_value(&value.value, value_type, &self.options)
    }

    /// Substitute values into every block.
    ///
    /// Only `text` changes; block count, order, type and style are kept.
    pub fn substitute(&self, blocks: &[ContentBlock], values: &ValueMap) -> SubstitutionOutcome {
        let plan = self.plan(values);
        let mut outcome = SubstitutionOutcome {
            blocks: Vec::with_capacity(blocks.len()),
            ..Default::default()
        };

        for block in blocks {
            let mut block = block.clone();
            block.text = plan.apply(&block.text, &mut outcome);
            outcome.blocks.push(block);
        }

        log::debug!(
            "SubstitutionEngine: {} replacements for {} variables",
            outcome.replacement_count,
            outcome.replaced.len()
        );
        outcome
    }

    /// Substitute values into a plain string.
    pub fn substitute_text(&self, text: &str, values: &ValueMap) -> String {
        let plan = self.plan(values);
        let mut outcome = SubstitutionOutcome::default();
        plan.apply(text, &mut outcome)
    }

    /// Tokens to replace with their formatted values.
    fn plan(&self, values: &ValueMap) -> Plan {
        let mut replacements = HashMap::new();
        for (name, value) in values {
            // Empty values leave the placeholder visible for missing-value checks
            if value.value.trim().is_empty() {
                continue;
            }
            let formatted = self.format(name, value);
            let mut tokens: BTreeSet<String> =
                PlaceholderSyntax::ALL.iter().map(|s| s.token(name)).collect();
            if let Some(aliases) = self.aliases.get(name) {
                tokens.extend(aliases.iter().cloned());
            }
            for token in tokens {
                replacements.insert(
                    token,
                    Replacement {
                        name: name.clone(),
                        value: formatted.clone(),
                    },
                );
            }
        }
        Plan::new(replacements)
    }
}

/// What replaces one literal token.
#[derive(Debug)]
struct Replacement {
    name: String,
    value: String,
}

/// All planned tokens matched in a single left-to-right scan.
#[derive(Debug)]
struct Plan {
    pattern: Option<Regex>,
    replacements: HashMap<String, Replacement>,
}

impl Plan {
    fn new(replacements: HashMap<String, Replacement>) -> Self {
        let mut tokens: Vec<&String> = replacements.keys().collect();
        // Alternation is leftmost-first, so longer tokens must come first
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&alternation) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("SubstitutionEngine: token pattern rejected: {}", e);
                    None
                }
            }
        };
        Self {
            pattern,
            replacements,
        }
    }

    /// Replace every token; inserted values are never rescanned.
    fn apply(&self, text: &str, outcome: &mut SubstitutionOutcome) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[0];
                match self.replacements.get(token) {
                    Some(replacement) => {
                        outcome.replacement_count += 1;
                        outcome.replaced.insert(replacement.name.clone());
                        replacement.value.clone()
                    }
                    None => token.to_string(),
                }
            })
            .into_owned()
    }
}

/// Substitute with default options.
pub fn substitute(blocks: &[ContentBlock], values: &ValueMap) -> Vec<ContentBlock> {
    SubstitutionEngine::default().substitute(blocks, values).blocks
}

/// Substitute into plain text with default options.
pub fn substitute_text(text: &str, values: &ValueMap) -> String {
    SubstitutionEngine::default().substitute_text(text, values)
}

/// Required placeholders still present in `blocks`.
pub fn missing_values(blocks: &[ContentBlock]) -> Vec<Warning> {
    missing_values_with_schema(blocks, &VariableSchema::default())
}

/// Like [`missing_values`], honoring the caller's optional fields.
pub fn missing_values_with_schema(
    blocks: &[ContentBlock],
    schema: &VariableSchema,
) -> Vec<Warning> {
    let mut residual = extract_blocks(blocks);
    apply_schema(&mut residual, schema);

    group_by_name(&residual)
        .into_iter()
        .filter(|variable| variable.required)
        .map(|variable| {
            let warning = Warning::MissingRequiredValue {
                name: variable.name,
                placeholders: variable.placeholders.into_iter().collect(),
            };
            log::warn!("{}", warning);
            warning
        })
        .collect()
}
