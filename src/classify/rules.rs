//! Line classification rules.
//!
//! Each [`Rule`] is a pure predicate paired with the class it assigns. The
//! cascade is evaluated in order and the first match wins; lines no rule claims
//! are paragraph text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ClassifierConfig;
use crate::parser::COLUMN_GAP;

/// CJK numerals used in ordinal markers.
const CJK_DIGITS: &str = "一二三四五六七八九十百千零〇两";

/// "第一章", "第3节", "第二部分".
static CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^第\s*[{}\d]+\s*(章|节|部分|篇|编)", CJK_DIGITS)).unwrap()
});

/// "第一条", "第12条".
static ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^第\s*[{}\d]+\s*条", CJK_DIGITS)).unwrap());

/// "1. ", "1、", "1．" but not "1.1".
static ARABIC_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\s*(\.|、|．)(\s|[^\d\s]|$)").unwrap());

/// "一、", "十二．".
static CJK_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^[{}]+\s*(、|．|\.)", CJK_DIGITS)).unwrap());

/// "1.1", "2.3.1".
static NESTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3})+(\s|\.|、|[^\d]|$)").unwrap());

/// "（一）", "(1)", "（1）", "(a)".
static PAREN_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^[（(]\s*([{}]+|\d{{1,3}}|[a-zA-Z])\s*[）)]", CJK_DIGITS)).unwrap()
});

/// "a)", "b．", "A. " and circled numerals.
static LETTER_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]\s*[)）]|[a-zA-Z]\s*[.．]\s|[①-⑳])").unwrap());

/// "Article 3", "Section 2", "Clause 4".
static LATIN_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(article|section|chapter|clause|schedule|appendix)\s+[\dIVX]+").unwrap()
});

/// A short "label：" prefix.
static FIELD_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^：:]{1,12}[：:]").unwrap());

/// "以下无正文", "本页无正文" in any bracket decoration.
static NO_BODY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(以下|本页|此页)\s*无\s*正文").unwrap());

/// Bar glyphs used by text-drawn tables.
const TABLE_GLYPHS: &[char] = &[
    '|', '｜', '│', '┃', '║', '┌', '┐', '└', '┘', '├', '┤', '┬', '┴', '┼',
];

/// Characters that form separator lines.
const SEPARATOR_CHARS: &[char] = &[
    '-', '—', '–', '_', '=', '*', '~', '·', '.', '－', '═', '━', '─', '＿', '…', ' ',
];

/// Sentence-terminal punctuation.
const TERMINALS: &[char] = &['。', '！', '？', '；', '.', '!', '?', ';'];

/// Closing marks that may trail terminal punctuation.
const TRAILING_CLOSERS: &[char] = &['”', '’', '"', '\'', '）', ')', '」', '』'];

/// The class assigned to one normalized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineClass {
    /// Document title
    Title,
    /// Chapter or section heading
    SectionHeader,
    /// Nested clause
    SubClause,
    /// Top-level clause
    Clause,
    /// Table row
    TableRow,
    /// Plain text
    Paragraph,
    /// Separators and end-of-body markers; dropped
    Discard,
}

/// Precomputed facts about a line, shared by every rule.
#[derive(Debug, Clone)]
pub struct LineFeatures<'a> {
    /// The normalized line
    pub text: &'a str,
    /// Length in characters
    pub char_count: usize,
    /// Cells split on column gaps
    pub column_cells: usize,
    /// Whitespace-separated tokens
    pub tokens: usize,
    /// Tokens that start with a "label：" prefix
    pub colon_labels: usize,
    /// Ends with sentence-terminal punctuation
    pub terminal: bool,
    /// Whether a structural line was already emitted before this one
    pub after_structure: bool,
}

impl<'a> LineFeatures<'a> {
    /// Compute features for `text`.
    pub fn new(text: &'a str) -> Self {
        let text = text.trim();
        let column_cells = text
            .split(COLUMN_GAP)
            .filter(|cell| !cell.trim().is_empty())
            .count();
        let token_list: Vec<&str> = text.split_whitespace().collect();
        let colon_labels = token_list
            .iter()
            .filter(|t| FIELD_LABEL.is_match(t))
            .count();

        Self {
            text,
            char_count: text.chars().count(),
            column_cells,
            tokens: token_list.len(),
            colon_labels,
            terminal: ends_with_terminal(text),
            after_structure: false,
        }
    }

    /// Set whether structure precedes this line.
    pub fn with_after_structure(mut self, after_structure: bool) -> Self {
        self.after_structure = after_structure;
        self
    }

    /// Whether the line opens with a top-level enumeration marker.
    pub fn has_item_marker(&self) -> bool {
        ARTICLE.is_match(self.text)
            || ARABIC_ITEM.is_match(self.text)
            || CJK_ITEM.is_match(self.text)
    }

    /// Whether the line opens with a nested enumeration marker.
    pub fn has_nested_marker(&self) -> bool {
        NESTED.is_match(self.text)
            || PAREN_ITEM.is_match(self.text)
            || LETTER_ITEM.is_match(self.text)
    }

    /// Whether the line is a short "label：value" field.
    pub fn is_field(&self) -> bool {
        FIELD_LABEL.is_match(self.text) && !self.has_item_marker() && !self.has_nested_marker()
    }
}

/// Whether `text` ends a sentence.
pub fn ends_with_terminal(text: &str) -> bool {
    let trimmed = text.trim_end().trim_end_matches(TRAILING_CLOSERS);
    trimmed.ends_with(TERMINALS)
}

/// One entry of the cascade.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Name used in debug logs
    pub name: &'static str,
    /// Predicate over the line
    pub matches: fn(&LineFeatures, &ClassifierConfig) -> bool,
    /// Class assigned on match
    pub class: LineClass,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("class", &self.class)
            .finish()
    }
}

/// The default cascade.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "separator",
            matches: is_separator,
            class: LineClass::Discard,
        },
        Rule {
            name: "no-body-marker",
            matches: is_no_body_marker,
            class: LineClass::Discard,
        },
        Rule {
            name: "title",
            matches: is_title,
            class: LineClass::Title,
        },
        Rule {
            name: "section-header",
            matches: is_section_header,
            class: LineClass::SectionHeader,
        },
        Rule {
            name: "sub-clause",
            matches: is_sub_clause,
            class: LineClass::SubClause,
        },
        Rule {
            name: "clause",
            matches: is_clause,
            class: LineClass::Clause,
        },
        Rule {
            name: "table-row",
            matches: is_table_row,
            class: LineClass::TableRow,
        },
    ]
}

/// Run the cascade; unmatched lines are paragraphs.
pub fn classify_line(
    features: &LineFeatures,
    config: &ClassifierConfig,
    rules: &[Rule],
) -> LineClass {
    rules
        .iter()
        .find(|rule| (rule.matches)(features, config))
        .map(|rule| rule.class)
        .unwrap_or(LineClass::Paragraph)
}

fn is_separator(line: &LineFeatures, _config: &ClassifierConfig) -> bool {
    line.char_count >= 3 && line.text.chars().all(|c| SEPARATOR_CHARS.contains(&c))
}

fn is_no_body_marker(line: &LineFeatures, _config: &ClassifierConfig) -> bool {
    line.char_count <= 20 && NO_BODY_MARKER.is_match(line.text)
}

fn is_title(line: &LineFeatures, config: &ClassifierConfig) -> bool {
    if line.after_structure
        || line.char_count >= config.title_max_chars
        || line.terminal
        || line.has_item_marker()
        || line.has_nested_marker()
        || FIELD_LABEL.is_match(line.text)
    {
        return false;
    }

    // "房屋租赁合同（示范文本）" still ends with its keyword
    let core = strip_trailing_parenthetical(line.text);
    let lower = core.to_lowercase();
    config
        .title_keywords
        .iter()
        .any(|k| core.ends_with(k.as_str()) || (k.is_ascii() && lower.contains(&k.to_lowercase())))
}

fn is_section_header(line: &LineFeatures, config: &ClassifierConfig) -> bool {
    if line.char_count >= config.header_max_chars
        || line.terminal
        || line.column_cells > 2
        || line.text.contains(['，', ','])
    {
        return false;
    }
    if CHAPTER.is_match(line.text) || LATIN_HEADING.is_match(line.text) {
        return true;
    }
    // A numbered line with a colon is a clause with content, not a heading
    let has_colon = line.text.contains(['：', ':']);
    if (ARTICLE.is_match(line.text) || CJK_ITEM.is_match(line.text)) && !has_colon {
        return true;
    }
    if ARABIC_ITEM.is_match(line.text) && !has_colon && line.char_count <= config.title_max_chars {
        return true;
    }
    !line.has_nested_marker()
        && !FIELD_LABEL.is_match(line.text)
        && config.header_keywords.iter().any(|k| line.text.contains(k.as_str()))
}

fn is_sub_clause(line: &LineFeatures, _config: &ClassifierConfig) -> bool {
    line.has_nested_marker()
}

fn is_clause(line: &LineFeatures, _config: &ClassifierConfig) -> bool {
    line.has_item_marker()
}

fn is_table_row(line: &LineFeatures, _config: &ClassifierConfig) -> bool {
    if line.text.contains(TABLE_GLYPHS) {
        return true;
    }
    line.column_cells >= 3 || (line.tokens >= 3 && line.colon_labels >= 2)
}

fn strip_trailing_parenthetical(text: &str) -> &str {
    let text = text.trim_end();
    for (open, close) in [('（', '）'), ('(', ')')] {
        if text.ends_with(close) {
            if let Some(idx) = text.rfind(open) {
                return text[..idx].trim_end();
            }
        }
    }
    text
}
