//! Heuristic layout classification.
//!
//! Turns a line-oriented text stream into an ordered sequence of
//! [`ContentBlock`]s. The pass is stateless between calls: every entry point
//! builds its own accumulator and returns a [`Classification`].

mod normalize;
mod rules;

pub use normalize::{
    collapse_whitespace, is_page_number_line, normalize_line, normalize_lines, NormalizedLine,
};
pub use rules::{
    classify_line, default_rules, ends_with_terminal, LineClass, LineFeatures, Rule,
};

use serde::{Deserialize, Serialize};

use crate::error::Warning;
use crate::model::{
    is_wide_char, BlockPosition, BlockType, ContentBlock, ParsedDocument, SourceKind,
};
use crate::parser::SourceStyle;

/// Lines below which a missing structure is not reported.
const DEGRADED_MIN_LINES: usize = 8;

/// Extra indent for nested clauses, in points.
const SUB_CLAUSE_INDENT: f32 = 24.0;

/// Classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lines shorter than this may be titles
    pub title_max_chars: usize,

    /// Lines shorter than this may be section headers
    pub header_max_chars: usize,

    /// Assumed lines per page when true pagination is unavailable
    pub lines_per_page: usize,

    /// Merged paragraphs stop growing past this many characters
    pub max_paragraph_chars: usize,

    /// Estimated line height in points
    pub line_height: f32,

    /// Estimated top margin in points
    pub top_margin: f32,

    /// Estimated left margin in points
    pub left_margin: f32,

    /// Estimated text width in points
    pub content_width: f32,

    /// Keywords that mark a title
    pub title_keywords: Vec<String>,

    /// Keywords that mark a section header
    pub header_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let owned =
            |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            title_max_chars: 30,
            header_max_chars: 50,
            lines_per_page: 40,
            max_paragraph_chars: 2000,
            line_height: 18.0,
            top_margin: 72.0,
            left_margin: 90.0,
            content_width: 415.0,
            title_keywords: owned(&[
                "合同", "协议", "合同书", "协议书", "契约", "确认书", "承诺书", "委托书",
                "agreement", "contract",
            ]),
            header_keywords: owned(&[
                "总则", "附则", "定义", "释义", "违约责任", "争议解决", "合同期限", "付款方式",
                "权利义务", "权利和义务", "保密条款", "不可抗力", "其他约定", "其他事项",
                "特别约定", "附件", "通知与送达", "合同的变更", "合同的解除",
            ]),
        }
    }
}

impl ClassifierConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title length threshold.
    pub fn with_title_max_chars(mut self, chars: usize) -> Self {
        self.title_max_chars = chars;
        self
    }

    /// Set the section header length threshold.
    pub fn with_header_max_chars(mut self, chars: usize) -> Self {
        self.header_max_chars = chars;
        self
    }

    /// Set the assumed lines per page.
    pub fn with_lines_per_page(mut self, lines: usize) -> Self {
        self.lines_per_page = lines.max(1);
        self
    }

    /// Set the paragraph merge cap.
    pub fn with_max_paragraph_chars(mut self, chars: usize) -> Self {
        self.max_paragraph_chars = chars;
        self
    }

    /// Add a title keyword.
    pub fn with_title_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.title_keywords.push(keyword.into());
        self
    }

    /// Add a section header keyword.
    pub fn with_header_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.header_keywords.push(keyword.into());
        self
    }
}

/// Output of one classification call.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Blocks in document order
    pub blocks: Vec<ContentBlock>,
    /// Soft failures
    pub warnings: Vec<Warning>,
}

/// Runs the rule cascade over text streams.
#[derive(Debug, Clone)]
pub struct LayoutClassifier {
    config: ClassifierConfig,
    rules: Vec<Rule>,
}

impl Default for LayoutClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl LayoutClassifier {
    /// Create a classifier with the default rule cascade.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            rules: default_rules(),
        }
    }

    /// Replace the rule cascade.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a whole text stream with estimated pagination.
    pub fn classify_text(&self, text: &str) -> Classification {
        let mut builder = BlockBuilder::new(self, 1, true, true);
        builder.feed_text(text);
        builder.finish()
    }

    /// Classify the text of a single page with its true page number.
    pub fn classify_page(&self, text: &str, page_number: u32) -> Classification {
        let mut builder = BlockBuilder::new(self, page_number.max(1), false, true);
        builder.feed_text(text);
        builder.finish()
    }

    /// Classify a parsed document.
    ///
    /// Flowed documents with markup trust its headings and table rows.
    /// Fixed-layout documents are classified page by page.
    pub fn classify_document(&self, document: &ParsedDocument) -> Classification {
        let classification = match (document.source_kind, &document.markup) {
            (SourceKind::Flowed, Some(markup)) => {
                let mut builder = BlockBuilder::new(self, 1, true, false);
                builder.feed_markup(markup);
                builder.finish()
            }
            (SourceKind::FixedLayout, _) if !document.pages.is_empty() => {
                let mut builder = BlockBuilder::new(self, 1, false, true);
                for page in &document.pages {
                    builder.begin_page(page.number);
                    builder.feed_text(&page.raw_text);
                }
                builder.finish()
            }
            _ => self.classify_text(&document.raw_text),
        };

        log::debug!(
            "LayoutClassifier: {} blocks from {} ({} warnings)",
            classification.blocks.len(),
            document.file_name,
            classification.warnings.len()
        );
        classification
    }
}

/// Classify a text stream with estimated pagination.
pub fn classify_text(text: &str, config: &ClassifierConfig) -> Classification {
    LayoutClassifier::new(config.clone()).classify_text(text)
}

/// Classify one page of text.
pub fn classify_page(text: &str, page_number: u32, config: &ClassifierConfig) -> Classification {
    LayoutClassifier::new(config.clone()).classify_page(text, page_number)
}

/// Classify a parsed document.
pub fn classify_document(document: &ParsedDocument, config: &ClassifierConfig) -> Classification {
    LayoutClassifier::new(config.clone()).classify_document(document)
}

/// A block still open for continuation lines.
#[derive(Debug)]
struct Pending {
    class: LineClass,
    text: String,
    page: u32,
    line_index: usize,
    lines: usize,
    open: bool,
    style: SourceStyle,
}

/// Accumulates classified lines into blocks.
struct BlockBuilder<'a> {
    config: &'a ClassifierConfig,
    rules: &'a [Rule],
    blocks: Vec<ContentBlock>,
    pending: Option<Pending>,
    page: u32,
    line_on_page: usize,
    paginate: bool,
    merge_lines: bool,
    seen_structure: bool,
    total_lines: usize,
    discarded: usize,
    line_style: SourceStyle,
}

impl<'a> BlockBuilder<'a> {
    fn new(
        classifier: &'a LayoutClassifier,
        first_page: u32,
        paginate: bool,
        merge_lines: bool,
    ) -> Self {
        Self {
            config: &classifier.config,
            rules: &classifier.rules,
            blocks: Vec::new(),
            pending: None,
            page: first_page,
            line_on_page: 0,
            paginate,
            merge_lines,
            seen_structure: false,
            total_lines: 0,
            discarded: 0,
            line_style: SourceStyle::default(),
        }
    }

    fn begin_page(&mut self, page_number: u32) {
        self.flush();
        self.page = page_number;
        self.line_on_page = 0;
    }

    fn feed_text(&mut self, text: &str) {
        for line in normalize_lines(text) {
            match line {
                NormalizedLine::Text(text) => self.push_line(&text, None),
                NormalizedLine::Blank => self.flush(),
                NormalizedLine::PageBreak => self.page_break(),
            }
        }
    }

    fn feed_markup(&mut self, markup: &str) {
        for line in markup.lines() {
            let (raw, style) = SourceStyle::split_markup(line);
            self.line_style = style;
            let trimmed = raw.trim();
            if let Some((level, heading)) = parse_markup_heading(trimmed) {
                let text = match normalize_line(heading) {
                    NormalizedLine::Text(text) => text,
                    _ => continue,
                };
                let class = match level {
                    1 if !self.seen_structure => LineClass::Title,
                    1 | 2 => LineClass::SectionHeader,
                    _ => LineClass::SubClause,
                };
                self.push_line(&text, Some(class));
            } else if let Some(cells) = parse_markup_row(trimmed) {
                self.push_line(&cells, Some(LineClass::TableRow));
            } else {
                match normalize_line(raw) {
                    NormalizedLine::Text(text) => self.push_line(&text, None),
                    NormalizedLine::Blank => self.flush(),
                    NormalizedLine::PageBreak => self.page_break(),
                }
            }
        }
        self.line_style = SourceStyle::default();
    }

    fn page_break(&mut self) {
        self.flush();
        self.page += 1;
        self.line_on_page = 0;
    }

    /// Reserve the next line slot, moving to a new page when the estimate overflows.
    fn next_slot(&mut self) -> (u32, usize) {
        if self.paginate && self.line_on_page >= self.config.lines_per_page {
            self.page += 1;
            self.line_on_page = 0;
        }
        let slot = (self.page, self.line_on_page);
        self.line_on_page += 1;
        slot
    }

    fn push_line(&mut self, text: &str, hint: Option<LineClass>) {
        let (page, line_index) = self.next_slot();
        self.total_lines += 1;

        let features = LineFeatures::new(text).with_after_structure(self.seen_structure);
        let class = hint.unwrap_or_else(|| classify_line(&features, self.config, self.rules));

        match class {
            LineClass::Discard => {
                self.discarded += 1;
                self.flush();
            }
            LineClass::Paragraph if features.is_field() => {
                self.flush();
                self.start(class, features.text, page, line_index, false);
                self.flush();
            }
            LineClass::Paragraph => {
                if !self.try_continue(features.text, page) {
                    self.flush();
                    self.start(class, features.text, page, line_index, !features.terminal);
                }
                if features.terminal || !self.merge_lines {
                    self.flush();
                }
            }
            LineClass::Clause | LineClass::SubClause => {
                self.flush();
                let open = !features.terminal && self.merge_lines;
                self.start(class, features.text, page, line_index, open);
                self.seen_structure = true;
            }
            LineClass::Title | LineClass::SectionHeader | LineClass::TableRow => {
                self.flush();
                self.start(class, features.text, page, line_index, false);
                self.flush();
                if class != LineClass::TableRow {
                    self.seen_structure = true;
                }
            }
        }
    }

    /// Append `text` to the open block when it is a continuation.
    fn try_continue(&mut self, text: &str, page: u32) -> bool {
        if !self.merge_lines {
            return false;
        }
        let cap = self.config.max_paragraph_chars;
        match self.pending.as_mut() {
            Some(pending)
                if pending.open
                    && pending.page == page
                    && pending.text.chars().count() + text.chars().count() <= cap =>
            {
                join_continuation(&mut pending.text, text);
                pending.lines += 1;
                true
            }
            _ => false,
        }
    }

    fn start(&mut self, class: LineClass, text: &str, page: u32, line_index: usize, open: bool) {
        self.pending = Some(Pending {
            class,
            text: text.to_string(),
            page,
            line_index,
            lines: 1,
            open,
            style: self.line_style,
        });
    }

    fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let block_type = match pending.class {
            LineClass::Title => BlockType::Title,
            LineClass::SectionHeader => BlockType::SectionHeader,
            LineClass::Clause => BlockType::Clause,
            LineClass::SubClause => BlockType::SubClause,
            LineClass::TableRow => BlockType::TableRow,
            LineClass::Paragraph => BlockType::Paragraph,
            LineClass::Discard => return,
        };

        let indent = if block_type == BlockType::SubClause {
            SUB_CLAUSE_INDENT
        } else {
            0.0
        };
        let position = BlockPosition {
            x: self.config.left_margin + indent,
            y: self.config.top_margin + pending.line_index as f32 * self.config.line_height,
            width: self.config.content_width - indent,
            height: pending.lines as f32 * self.config.line_height,
        };
        let mut block = ContentBlock::new(block_type, pending.text, pending.page).at(position);
        pending.style.apply(&mut block.style);
        self.blocks.push(block);
    }

    fn finish(mut self) -> Classification {
        self.flush();

        let mut warnings = Vec::new();
        let structured = self.blocks.iter().any(|b| b.block_type.is_structural());
        if self.total_lines >= DEGRADED_MIN_LINES && !structured {
            warnings.push(Warning::ClassificationDegraded {
                reason: format!("no headings or clauses in {} lines", self.total_lines),
            });
        }
        if self.total_lines > 0 && self.discarded * 2 > self.total_lines {
            warnings.push(Warning::ClassificationDegraded {
                reason: format!("{} of {} lines discarded", self.discarded, self.total_lines),
            });
        }
        for warning in &warnings {
            log::warn!("{}", warning);
        }

        Classification {
            blocks: self.blocks,
            warnings,
        }
    }
}

/// Join a soft-wrapped line, adding a space only between non-wide characters.
fn join_continuation(text: &mut String, next: &str) {
    let last_wide = text.chars().last().map(is_wide_char).unwrap_or(true);
    let first_wide = next.chars().next().map(is_wide_char).unwrap_or(true);
    if !(last_wide || first_wide) {
        text.push(' ');
    }
    text.push_str(next);
}

/// `## heading` to `(2, "heading")`.
fn parse_markup_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim()))
}

/// `| a | b |` to `a | b`.
fn parse_markup_row(line: &str) -> Option<String> {
    if line.len() < 2 || !line.starts_with('|') || !line.ends_with('|') {
        return None;
    }
    let cells: Vec<String> = line[1..line.len() - 1]
        .split('|')
        .map(|cell| collapse_whitespace(cell.trim()))
        .collect();
    Some(cells.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, BlockStyle, PageContent};

    const LEASE: &str = "房屋租赁合同\n\
        甲方：[甲方名称]\n\
        乙方：[乙方名称]\n\
        第一条 租赁物\n\
        甲方将位于[房屋地址]的房屋出租给乙方使用，\n\
        租赁面积为[面积]平方米。\n\
        第二条 租金及支付方式\n\
        1.1 月租金为人民币{{月租金}}元，\n\
        乙方应于每月五日前支付。\n\
        名称  数量  单价\n\
        空调  2  3000\n\
        第 1 页\n\
        （以下无正文）";

    fn types(classification: &Classification) -> Vec<BlockType> {
        classification.blocks.iter().map(|b| b.block_type).collect()
    }

    #[test]
    fn test_classify_lease() {
        let result = classify_text(LEASE, &ClassifierConfig::default());
        assert_eq!(
            types(&result),
            vec![
                BlockType::Title,
                BlockType::Paragraph,
                BlockType::Paragraph,
                BlockType::SectionHeader,
                BlockType::Paragraph,
                BlockType::SectionHeader,
                BlockType::SubClause,
                BlockType::TableRow,
                BlockType::TableRow,
            ]
        );
        assert_eq!(
            result.blocks[4].text,
            "甲方将位于[房屋地址]的房屋出租给乙方使用，租赁面积为[面积]平方米。"
        );
        assert_eq!(
            result.blocks[6].text,
            "1.1 月租金为人民币{{月租金}}元，乙方应于每月五日前支付。"
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_field_lines_stay_separate() {
        let text = "甲方：[甲方名称]\n乙方：[乙方名称]\n金额：{{合同金额}}";
        let result = classify_text(text, &ClassifierConfig::default());
        let texts: Vec<&str> = result.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["甲方：[甲方名称]", "乙方：[乙方名称]", "金额：{{合同金额}}"]);
    }

    #[test]
    fn test_latin_soft_wrap_joins_with_space() {
        let text = "The tenant shall pay the rent\nbefore the fifth day of each month.";
        let result = classify_text(text, &ClassifierConfig::default());
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(
            result.blocks[0].text,
            "The tenant shall pay the rent before the fifth day of each month."
        );
    }

    #[test]
    fn test_estimated_pagination() {
        let text: String = (1..=5).map(|i| format!("第{}句话。\n", i)).collect();
        let config = ClassifierConfig::default().with_lines_per_page(2);
        let result = classify_text(&text, &config);
        let pages: Vec<u32> = result.blocks.iter().map(|b| b.page_number).collect();
        assert_eq!(pages, vec![1, 1, 2, 2, 3]);

        // y restarts on each page and grows down it
        assert!(result.blocks[1].position.y > result.blocks[0].position.y);
        assert_eq!(result.blocks[2].position.y, result.blocks[0].position.y);
    }

    #[test]
    fn test_form_feed_starts_new_page() {
        let result = classify_text("第一段。\n\u{000C}\n第二段。", &ClassifierConfig::default());
        let pages: Vec<u32> = result.blocks.iter().map(|b| b.page_number).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_classify_page_keeps_page_number() {
        let result = classify_page("第五条 争议解决", 3, &ClassifierConfig::default());
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].page_number, 3);
        assert_eq!(result.blocks[0].block_type, BlockType::SectionHeader);
    }

    #[test]
    fn test_markup_guided_classification() {
        let mut doc = ParsedDocument::new(SourceKind::Flowed, "a.docx");
        doc.markup = Some(
            "# 采购合同\n## 第一章 总则\n### 交货\n| 名称 | 数量 |\n<!-- page-break -->\n没有标点的段落\n另一段"
                .to_string(),
        );
        let result = classify_document(&doc, &ClassifierConfig::default());
        assert_eq!(
            types(&result),
            vec![
                BlockType::Title,
                BlockType::SectionHeader,
                BlockType::SubClause,
                BlockType::TableRow,
                BlockType::Paragraph,
                BlockType::Paragraph,
            ]
        );
        assert_eq!(result.blocks[3].text, "名称 | 数量");
        assert_eq!(result.blocks[4].page_number, 2);
    }

    #[test]
    fn test_markup_style_annotations_reach_blocks() {
        let mut doc = ParsedDocument::new(SourceKind::Flowed, "a.docx");
        doc.markup = Some(
            "# 保密协议 <!-- style: center -->\n特别提示 <!-- style: center bold -->\n普通段落\n甲方（盖章）： <!-- style: right -->"
                .to_string(),
        );
        let result = classify_document(&doc, &ClassifierConfig::default());
        let blocks = &result.blocks;

        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].text, "保密协议");
        assert_eq!(blocks[1].text, "特别提示");
        assert!(blocks[1].style.bold);
        assert_eq!(blocks[1].style.alignment, Alignment::Center);
        // Unannotated lines keep the per-type defaults
        assert_eq!(blocks[2].style, BlockStyle::for_type(blocks[2].block_type));
        assert_eq!(blocks[3].style.alignment, Alignment::Right);
        assert!(blocks.iter().all(|b| !b.text.contains("<!--")));
    }

    #[test]
    fn test_fixed_layout_uses_page_numbers() {
        let mut doc = ParsedDocument::new(SourceKind::FixedLayout, "a.pdf");
        for (number, text) in [(1, "服务协议\n第一条 服务内容"), (2, "第二条 服务费用")] {
            let mut page = PageContent::a4(number);
            page.raw_text = text.to_string();
            doc.pages.push(page);
        }
        let result = classify_document(&doc, &ClassifierConfig::default());
        let pages: Vec<u32> = result.blocks.iter().map(|b| b.page_number).collect();
        assert_eq!(pages, vec![1, 1, 2]);
        assert_eq!(result.blocks[0].block_type, BlockType::Title);
    }

    #[test]
    fn test_unstructured_text_is_degraded() {
        let text: String = (0..10).map(|i| format!("普通文本第{}行。\n", i)).collect();
        let result = classify_text(&text, &ClassifierConfig::default());
        assert_eq!(result.blocks.len(), 10);
        assert!(matches!(
            result.warnings.as_slice(),
            [Warning::ClassificationDegraded { .. }]
        ));
    }

    #[test]
    fn test_mostly_discarded_is_degraded() {
        let result = classify_text("-----\n=====\n正文。", &ClassifierConfig::default());
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_empty_text() {
        let result = classify_text("", &ClassifierConfig::default());
        assert!(result.blocks.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_paragraph_cap_splits_long_runs() {
        let config = ClassifierConfig::default().with_max_paragraph_chars(10);
        let result = classify_text("一二三四五六\n七八九十一二\n三四。", &config);
        assert_eq!(result.blocks.len(), 2);
    }
}
