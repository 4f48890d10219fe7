//! Whitespace and boilerplate normalization ahead of classification.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::parser::{COLUMN_GAP, PAGE_BREAK_CHAR, PAGE_BREAK_MARKUP};

/// Bare page numbers: "3", "- 3 -", "—3—".
static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-–—]?\s*\d{1,4}\s*[-–—]?$").unwrap());

/// "第 3 页", "第3页 共10页", "共10页 第3页".
static CJK_PAGE_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(共\s*\d+\s*页\s*[,，]?\s*)?第\s*\d+\s*页(\s*[,，/]?\s*共\s*\d+\s*页)?$").unwrap()
});

/// "Page 3", "Page 3 of 10", "3 / 10", "3 of 10".
static LATIN_PAGE_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(page\s*)?\d+\s*(of|/)\s*\d+$|^page\s*\d+$").unwrap()
});

/// Adapter-injected annotations such as `<!-- page-break -->`.
static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!--.*?-->").unwrap());

/// One line after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedLine {
    /// A line with visible text
    Text(String),
    /// An empty line; ends paragraph accumulation
    Blank,
    /// Explicit page break
    PageBreak,
}

/// Normalize a whole text stream into lines.
///
/// Line endings are unified, horizontal whitespace collapsed, page-number
/// boilerplate and annotations removed. Form feeds and page-break
/// annotations become [`NormalizedLine::PageBreak`].
pub fn normalize_lines(text: &str) -> Vec<NormalizedLine> {
    let text: String = text.nfc().collect();
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = Vec::new();
    for raw in text.split('\n') {
        // Form feeds may sit in the middle of a line
        let mut segments = raw.split(PAGE_BREAK_CHAR).peekable();
        while let Some(segment) = segments.next() {
            lines.push(normalize_line(segment));
            if segments.peek().is_some() {
                lines.push(NormalizedLine::PageBreak);
            }
        }
    }
    lines
}

/// Normalize a single line.
pub fn normalize_line(line: &str) -> NormalizedLine {
    if line.trim() == PAGE_BREAK_MARKUP {
        return NormalizedLine::PageBreak;
    }

    let stripped = ANNOTATION.replace_all(line, "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| *c != '\u{FEFF}' && *c != '\u{FFFD}')
        .collect();
    let collapsed = collapse_whitespace(&cleaned);

    if collapsed.is_empty() || is_page_number_line(&collapsed) {
        NormalizedLine::Blank
    } else {
        NormalizedLine::Text(collapsed)
    }
}

/// Collapse horizontal whitespace.
///
/// A single space stays a space; tabs and runs of two or more spaces become
/// [`COLUMN_GAP`] so table columns survive. Ideographic and no-break spaces
/// count as spaces.
pub fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = 0usize;
    let mut saw_tab = false;

    let flush = |out: &mut String, run: usize, saw_tab: bool| {
        if out.is_empty() {
            return;
        }
        if saw_tab || run >= 2 {
            out.push_str(COLUMN_GAP);
        } else if run == 1 {
            out.push(' ');
        }
    };

    for c in line.chars() {
        match c {
            '\t' => {
                run += 1;
                saw_tab = true;
            }
            ' ' | '\u{00A0}' | '\u{3000}' | '\u{2002}' | '\u{2003}' | '\u{2009}' => run += 1,
            _ => {
                flush(&mut out, run, saw_tab);
                run = 0;
                saw_tab = false;
                out.push(c);
            }
        }
    }
    out
}

/// Whether a line is page-numbering boilerplate.
pub fn is_page_number_line(line: &str) -> bool {
    let line = line.trim();
    PAGE_NUMBER.is_match(line) || CJK_PAGE_OF.is_match(line) || LATIN_PAGE_OF.is_match(line)
}
