//! Placeholder extraction.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::infer::infer_type;
use crate::model::{
    ContentBlock, LogicalVariable, PlaceholderPosition, PlaceholderSyntax, VariablePlaceholder,
    VariableSchema,
};

/// Characters of context kept on each side of a token.
pub const CONTEXT_CHARS: usize = 50;

/// Longest accepted logical name, in characters.
pub const MAX_NAME_CHARS: usize = 64;

static PATTERNS: Lazy<Vec<(PlaceholderSyntax, Regex)>> = Lazy::new(|| {
    vec![
        (PlaceholderSyntax::DollarCurly, Regex::new(r"\$\{([^{}\n]+)\}").unwrap()),
        (PlaceholderSyntax::DoubleCurly, Regex::new(r"\{\{([^{}\n]+)\}\}").unwrap()),
        (PlaceholderSyntax::Square, Regex::new(r"\[([^\[\]\n]+)\]").unwrap()),
        (PlaceholderSyntax::Lenticular, Regex::new(r"【([^【】\n]+)】").unwrap()),
        (PlaceholderSyntax::FullwidthSquare, Regex::new(r"［([^［］\n]+)］").unwrap()),
    ]
});

/// A raw token match before dedup.
struct TokenMatch<'a> {
    syntax: PlaceholderSyntax,
    token: &'a str,
    name: &'a str,
    start: usize,
    end: usize,
}

/// Find every placeholder in `text`, deduplicated by exact token.
pub fn extract(text: &str) -> Vec<VariablePlaceholder> {
    let mut seen = HashSet::new();
    collect(text, None, &mut seen)
}

/// Find placeholders across blocks; positions carry the block index.
pub fn extract_blocks(blocks: &[ContentBlock]) -> Vec<VariablePlaceholder> {
    let mut seen = HashSet::new();
    blocks
        .iter()
        .enumerate()
        .flat_map(|(index, block)| collect(&block.text, Some(index), &mut seen))
        .collect()
}

/// Merge placeholders that share a logical name, in first-seen order.
pub fn group_by_name(placeholders: &[VariablePlaceholder]) -> Vec<LogicalVariable> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: BTreeMap<String, LogicalVariable> = BTreeMap::new();

    for placeholder in placeholders {
        let variable = by_name
            .entry(placeholder.logical_name.clone())
            .or_insert_with(|| {
                order.push(placeholder.logical_name.clone());
                let mut variable =
                    LogicalVariable::new(&placeholder.logical_name, placeholder.inferred_type);
                variable.required = placeholder.required;
                variable
            });
        variable.placeholders.insert(placeholder.placeholder_text.clone());
        variable.required |= placeholder.required;
    }

    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}

/// Apply caller overrides of type and required flag.
pub fn apply_schema(placeholders: &mut [VariablePlaceholder], schema: &VariableSchema) {
    for placeholder in placeholders {
        if let Some(field) = schema.field(&placeholder.logical_name) {
            if let Some(value_type) = field.value_type {
                placeholder.inferred_type = value_type;
            }
            if let Some(required) = field.required {
                placeholder.required = required;
            }
        }
    }
}

fn collect(
    text: &str,
    block_index: Option<usize>,
    seen: &mut HashSet<String>,
) -> Vec<VariablePlaceholder> {
    let mut matches: Vec<TokenMatch> = Vec::new();
    for (syntax, regex) in PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            matches.push(TokenMatch {
                syntax: *syntax,
                token: whole.as_str(),
                name: name.as_str().trim(),
                start: whole.start(),
                end: whole.end(),
            });
        }
    }
    matches.sort_by_key(|m| m.start);

    let mut placeholders = Vec::new();
    let mut covered_until = 0;
    for m in matches {
        // Overlapping hits keep the earliest token
        if m.start < covered_until {
            continue;
        }
        if !is_valid_name(m.name) {
            continue;
        }
        covered_until = m.end;
        if !seen.insert(m.token.to_string()) {
            continue;
        }
        placeholders.push(VariablePlaceholder {
            placeholder_text: m.token.to_string(),
            logical_name: m.name.to_string(),
            inferred_type: infer_type(m.name),
            syntax: m.syntax,
            position: PlaceholderPosition {
                offset: text[..m.start].chars().count(),
                block_index,
            },
            context: context_window(text, m.start, m.end),
            required: true,
        });
    }
    placeholders
}

/// Names must carry a letter or ideograph and stay short.
fn is_valid_name(name: &str) -> bool {
    let count = name.chars().count();
    count > 0 && count <= MAX_NAME_CHARS && name.chars().any(char::is_alphabetic)
}

/// The token plus up to `CONTEXT_CHARS` characters on each side.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let before = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let after = text[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    text[before..after].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    #[test]
    fn test_every_syntax_is_found() {
        let text = "甲方：[甲方名称]，金额：{{合同金额}}，日期：${签订日期}，\
                    地址：【房屋地址】，比例：［违约金比例］。";
        let found = extract(text);
        let names: Vec<&str> = found.iter().map(|p| p.logical_name.as_str()).collect();
        assert_eq!(names, vec!["甲方名称", "合同金额", "签订日期", "房屋地址", "违约金比例"]);

        let syntaxes: Vec<PlaceholderSyntax> = found.iter().map(|p| p.syntax).collect();
        assert_eq!(
            syntaxes,
            vec![
                PlaceholderSyntax::Square,
                PlaceholderSyntax::DoubleCurly,
                PlaceholderSyntax::DollarCurly,
                PlaceholderSyntax::Lenticular,
                PlaceholderSyntax::FullwidthSquare,
            ]
        );
        assert_eq!(found[1].inferred_type, ValueType::Currency);
        assert_eq!(found[2].inferred_type, ValueType::Date);
        assert_eq!(found[4].inferred_type, ValueType::Percentage);
        assert!(found.iter().all(|p| p.required && !p.context.is_empty()));
    }

    #[test]
    fn test_duplicates_keep_first_context() {
        let text = "首次出现[甲方]在这里。后面又出现[甲方]。";
        let found = extract(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].position.offset, 4);
        assert!(found[0].context.starts_with("首次出现"));
    }

    #[test]
    fn test_context_is_clamped() {
        let long = "字".repeat(80);
        let text = format!("{}[名称]{}", long, long);
        let found = extract(&text);
        assert_eq!(found[0].context.chars().count(), 50 + "[名称]".chars().count() + 50);

        let found = extract("[名称]");
        assert_eq!(found[0].context, "[名称]");
    }

    #[test]
    fn test_invalid_names_are_skipped() {
        let found = extract("见附件[1]与[ ]以及[2.3]，但[乙方]有效");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].logical_name, "乙方");

        let long_name = format!("[{}]", "名".repeat(65));
        assert!(extract(&long_name).is_empty());
    }

    #[test]
    fn test_names_are_trimmed() {
        let found = extract("金额：{{ 合同金额 }}");
        assert_eq!(found[0].logical_name, "合同金额");
        assert_eq!(found[0].placeholder_text, "{{ 合同金额 }}");
    }

    #[test]
    fn test_dollar_curly_is_not_also_double_counted() {
        let found = extract("${name} and {{name}}");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].syntax, PlaceholderSyntax::DollarCurly);
    }

    #[test]
    fn test_extract_blocks_records_block_index() {
        let blocks = vec![
            ContentBlock::paragraph("甲方：[甲方名称]"),
            ContentBlock::paragraph("再次：[甲方名称]，乙方：[乙方名称]"),
        ];
        let found = extract_blocks(&blocks);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].position.block_index, Some(0));
        assert_eq!(found[1].position.block_index, Some(1));
        assert_eq!(found[1].logical_name, "乙方名称");
    }

    #[test]
    fn test_group_by_name_aliases_syntaxes() {
        let found = extract("[合同金额] {{合同金额}} 【甲方】");
        let vars = group_by_name(&found);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "合同金额");
        assert_eq!(vars[0].placeholders.len(), 2);
        assert_eq!(vars[0].value_type, ValueType::Currency);
        assert_eq!(vars[1].name, "甲方");
    }

    #[test]
    fn test_apply_schema() {
        let mut found = extract("[备注] [签约日]");
        let schema = VariableSchema::new()
            .optional("备注")
            .with_type("签约日", ValueType::Date);
        apply_schema(&mut found, &schema);
        assert!(!found[0].required);
        assert_eq!(found[1].inferred_type, ValueType::Date);

        let vars = group_by_name(&found);
        assert!(!vars[0].required);
    }
}
