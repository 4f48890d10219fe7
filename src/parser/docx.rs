//! Flowed-document (DOCX) ingestion.
//!
//! Walks `word/document.xml` with a streaming XML reader and produces plain
//! text plus a Markdown-like markup that keeps heading levels and table rows.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{Error, Result, Warning};
use crate::model::{Alignment, BlockStyle, PageContent, ParsedDocument, SourceKind};

use super::options::{ErrorMode, IngestOptions};
use super::{IngestionAdapter, Ingestion};

/// Markup annotation for an explicit page break.
pub const PAGE_BREAK_MARKUP: &str = "<!-- page-break -->";

/// Form feed, used in raw text for explicit page breaks.
pub const PAGE_BREAK_CHAR: char = '\u{000C}';

/// Opening of the trailing annotation that carries paragraph formatting in markup.
pub const STYLE_MARKUP_PREFIX: &str = "<!-- style:";

/// Paragraph formatting read from the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStyle {
    /// Explicit paragraph alignment
    pub alignment: Option<Alignment>,
    /// Every visible character is bold
    pub bold: bool,
}

impl SourceStyle {
    /// Whether there is nothing to carry.
    pub fn is_plain(&self) -> bool {
        self.alignment.is_none() && !self.bold
    }

    /// Override the per-type defaults of a block style.
    pub fn apply(&self, style: &mut BlockStyle) {
        if let Some(alignment) = self.alignment {
            style.alignment = alignment;
        }
        style.bold |= self.bold;
    }

    /// Annotation appended to a markup line, e.g. `<!-- style: right bold -->`.
    pub fn to_markup(&self) -> Option<String> {
        if self.is_plain() {
            return None;
        }
        let mut words = Vec::new();
        if let Some(alignment) = self.alignment {
            words.push(match alignment {
                Alignment::Left => "left",
                Alignment::Center => "center",
                Alignment::Right => "right",
                Alignment::Justify => "justify",
            });
        }
        if self.bold {
            words.push("bold");
        }
        Some(format!("{} {} -->", STYLE_MARKUP_PREFIX, words.join(" ")))
    }

    /// Split a trailing annotation off a markup line.
    pub fn split_markup(line: &str) -> (&str, SourceStyle) {
        let trimmed = line.trim_end();
        let Some(start) = trimmed.rfind(STYLE_MARKUP_PREFIX) else {
            return (line, SourceStyle::default());
        };
        let Some(body) = trimmed[start + STYLE_MARKUP_PREFIX.len()..].strip_suffix("-->") else {
            return (line, SourceStyle::default());
        };

        let mut style = SourceStyle::default();
        for word in body.split_whitespace() {
            match word {
                "left" => style.alignment = Some(Alignment::Left),
                "center" => style.alignment = Some(Alignment::Center),
                "right" => style.alignment = Some(Alignment::Right),
                "justify" => style.alignment = Some(Alignment::Justify),
                "bold" => style.bold = true,
                _ => {}
            }
        }
        (trimmed[..start].trim_end(), style)
    }
}

/// Ingestion adapter for flowed word-processor documents.
#[derive(Debug, Clone, Default)]
pub struct DocxAdapter {
    options: IngestOptions,
}

impl DocxAdapter {
    /// Create a new DOCX adapter.
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }
}

impl IngestionAdapter for DocxAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Flowed
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<Ingestion> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let document_xml = read_entry(&mut archive, "word/document.xml")?
            .ok_or_else(|| Error::CorruptInput("missing word/document.xml".to_string()))?;
        let body = walk_body(&document_xml)?;

        let core = match read_entry(&mut archive, "docProps/core.xml") {
            Ok(Some(xml)) => read_text_elements(&xml, &["dc:title", "dc:creator"]),
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::debug!("Ignoring unreadable docProps/core.xml: {}", e);
                HashMap::new()
            }
        };
        let app_pages = match read_entry(&mut archive, "docProps/app.xml") {
            Ok(Some(xml)) => read_text_elements(&xml, &["Pages"])
                .get("Pages")
                .and_then(|p| p.trim().parse::<u32>().ok()),
            _ => None,
        };

        let mut document = body.into_document(file_name);
        document.metadata.title = core.get("dc:title").cloned().filter(|t| !t.is_empty());
        document.metadata.author = core.get("dc:creator").cloned().filter(|a| !a.is_empty());
        if let Some(pages) = app_pages.filter(|p| *p > 0) {
            document.metadata.page_count = pages;
        }

        log::debug!(
            "DOCX '{}': {} pages, {} chars, tables={}, images={}",
            file_name,
            document.metadata.page_count,
            document.raw_text.chars().count(),
            document.metadata.has_tables,
            document.metadata.has_images
        );

        let mut warnings = Vec::new();
        if document.is_empty() {
            if self.options.error_mode == ErrorMode::Strict {
                return Err(Error::EmptyContent);
            }
            log::warn!("DOCX '{}' contains no text", file_name);
            warnings.push(Warning::EmptyContent);
        }

        Ok(Ingestion { document, warnings })
    }
}

/// Read a ZIP entry as UTF-8, `None` if it does not exist.
fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| Error::CorruptInput(format!("{}: {}", name, e)))?;
    Ok(Some(content))
}

/// Extract an attribute value by key from an element.
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Check if w:val attribute is explicitly "0" or "false" (formatting off).
fn is_val_off(e: &BytesStart) -> bool {
    matches!(get_attr(e, b"w:val").as_deref(), Some("0") | Some("false") | Some("none"))
}

/// Collect the text of simple elements such as `<dc:title>`.
fn read_text_elements(xml: &str, names: &[&str]) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut values = HashMap::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current = names.contains(&name.as_str()).then_some(name);
            }
            Ok(Event::Text(t)) => {
                if let Some(name) = current.take() {
                    if let Ok(text) = t.unescape() {
                        values.insert(name, text.trim().to_string());
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    values
}

/// A body-level item in document order.
#[derive(Debug, Clone, PartialEq)]
enum BodyItem {
    Paragraph(DocxParagraph),
    TableRow(Vec<String>),
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DocxParagraph {
    text: String,
    style_id: Option<String>,
    alignment: Option<Alignment>,
    bold: bool,
}

impl DocxParagraph {
    fn source_style(&self) -> SourceStyle {
        SourceStyle {
            alignment: self.alignment,
            bold: self.bold,
        }
    }

    /// Heading level implied by the paragraph style.
    fn heading_level(&self) -> Option<u8> {
        let style = self.style_id.as_deref()?;
        let lower = style.to_lowercase().replace(' ', "");
        if lower == "title" {
            return Some(1);
        }
        if lower == "subtitle" {
            return Some(2);
        }
        let digits = lower.strip_prefix("heading").unwrap_or(&lower);
        match digits.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }
}

/// Everything collected from `word/document.xml`.
#[derive(Debug, Default)]
struct DocxBody {
    items: Vec<BodyItem>,
    has_tables: bool,
    has_images: bool,
}

#[derive(Debug, Default)]
struct WalkState {
    body: DocxBody,
    paragraph: Option<DocxParagraph>,
    in_ppr: bool,
    in_run: bool,
    in_rpr: bool,
    in_text: bool,
    run_bold: bool,
    bold_chars: usize,
    plain_chars: usize,
    table_depth: usize,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl WalkState {
    fn start_paragraph(&mut self) {
        self.paragraph = Some(DocxParagraph::default());
        self.bold_chars = 0;
        self.plain_chars = 0;
    }

    fn push_text(&mut self, text: &str) {
        let Some(paragraph) = self.paragraph.as_mut() else {
            return;
        };
        paragraph.text.push_str(text);
        let visible = text.chars().filter(|c| !c.is_whitespace()).count();
        if self.run_bold {
            self.bold_chars += visible;
        } else {
            self.plain_chars += visible;
        }
    }

    fn end_paragraph(&mut self) {
        let Some(mut paragraph) = self.paragraph.take() else {
            return;
        };
        paragraph.bold = self.bold_chars > 0 && self.plain_chars == 0;

        if self.table_depth > 0 {
            if let Some(cell) = self.cell.as_mut() {
                let text = paragraph.text.trim();
                if !text.is_empty() {
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(text);
                }
            }
            return;
        }
        self.body.items.push(BodyItem::Paragraph(paragraph));
    }

    /// A page break splits the current paragraph.
    fn page_break(&mut self) {
        if self.table_depth > 0 {
            return;
        }
        if let Some(paragraph) = self.paragraph.as_mut() {
            if !paragraph.text.trim().is_empty() {
                let head = DocxParagraph {
                    text: std::mem::take(&mut paragraph.text),
                    ..paragraph.clone()
                };
                self.body.items.push(BodyItem::Paragraph(head));
            }
        }
        self.body.items.push(BodyItem::PageBreak);
    }

    fn handle_start(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"w:p" => self.start_paragraph(),
            b"w:pPr" => self.in_ppr = true,
            b"w:r" => {
                self.in_run = true;
                self.run_bold = false;
            }
            b"w:rPr" => self.in_rpr = true,
            b"w:t" => self.in_text = true,
            b"w:tbl" => {
                self.table_depth += 1;
                self.body.has_tables = true;
            }
            b"w:tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            b"w:tc" if self.table_depth == 1 => self.cell = Some(String::new()),
            b"w:drawing" | b"w:pict" | b"w:object" => self.body.has_images = true,
            _ => self.handle_empty(e),
        }
    }

    fn handle_empty(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"w:pStyle" if self.in_ppr => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.style_id = get_attr(e, b"w:val");
                }
            }
            b"w:jc" if self.in_ppr => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.alignment = match get_attr(e, b"w:val").as_deref() {
                        Some("center") => Some(Alignment::Center),
                        Some("right") | Some("end") => Some(Alignment::Right),
                        Some("both") | Some("distribute") => Some(Alignment::Justify),
                        Some("left") | Some("start") => Some(Alignment::Left),
                        _ => None,
                    };
                }
            }
            b"w:b" if self.in_rpr => self.run_bold = !is_val_off(e),
            b"w:tab" if self.in_run => self.push_text("\t"),
            b"w:br" | b"w:cr" if self.in_run => {
                if get_attr(e, b"w:type").as_deref() == Some("page") {
                    self.page_break();
                } else {
                    self.push_text("\n");
                }
            }
            b"w:drawing" | b"w:pict" => self.body.has_images = true,
            _ => {}
        }
    }

    fn handle_end(&mut self, name: &[u8]) {
        match name {
            b"w:p" => self.end_paragraph(),
            b"w:pPr" => self.in_ppr = false,
            b"w:r" => {
                self.in_run = false;
                self.run_bold = false;
            }
            b"w:rPr" => self.in_rpr = false,
            b"w:t" => self.in_text = false,
            b"w:tc" if self.table_depth == 1 => {
                if let (Some(row), Some(cell)) = (self.row.as_mut(), self.cell.take()) {
                    row.push(cell);
                }
            }
            b"w:tr" if self.table_depth == 1 => {
                if let Some(row) = self.row.take() {
                    if row.iter().any(|c| !c.trim().is_empty()) {
                        self.body.items.push(BodyItem::TableRow(row));
                    }
                }
            }
            b"w:tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }
}

/// Walk the document body in order.
fn walk_body(xml: &str) -> Result<DocxBody> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut state = WalkState::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => state.handle_start(&e),
            Event::Empty(e) => state.handle_empty(&e),
            Event::End(e) => state.handle_end(e.name().as_ref()),
            Event::Text(t) if state.in_text => {
                let text = t.unescape()?;
                state.push_text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.body)
}

impl DocxBody {
    /// Flatten the body into text, markup and pages.
    fn into_document(self, file_name: &str) -> ParsedDocument {
        let mut document = ParsedDocument::new(SourceKind::Flowed, file_name);
        let mut text_lines: Vec<String> = Vec::new();
        let mut markup_lines: Vec<String> = Vec::new();
        let mut page_lines: Vec<String> = Vec::new();
        let mut pages: Vec<PageContent> = Vec::new();

        let mut flush_page = |lines: &mut Vec<String>, pages: &mut Vec<PageContent>| {
            let mut page = PageContent::a4(pages.len() as u32 + 1);
            page.raw_text = lines.join("\n");
            pages.push(page);
            lines.clear();
        };

        for item in &self.items {
            match item {
                BodyItem::Paragraph(p) => {
                    let annotation = p.source_style().to_markup();
                    let annotate = |line: String| match &annotation {
                        Some(a) if !line.trim().is_empty() => format!("{} {}", line, a),
                        _ => line,
                    };
                    let lines: Vec<&str> = p.text.split('\n').map(str::trim_end).collect();
                    match p.heading_level() {
                        Some(level) => {
                            let heading = lines
                                .iter()
                                .map(|l| l.trim())
                                .filter(|l| !l.is_empty())
                                .collect::<Vec<_>>()
                                .join(" ");
                            if heading.is_empty() {
                                continue;
                            }
                            markup_lines.push(annotate(format!(
                                "{} {}",
                                "#".repeat(level as usize),
                                heading
                            )));
                            text_lines.push(heading.clone());
                            page_lines.push(heading);
                        }
                        None => {
                            for line in lines {
                                markup_lines.push(annotate(line.to_string()));
                                text_lines.push(line.to_string());
                                page_lines.push(line.to_string());
                            }
                        }
                    }
                }
                BodyItem::TableRow(cells) => {
                    let cells: Vec<String> = cells
                        .iter()
                        .map(|c| c.replace(['\n', '\t'], " ").trim().to_string())
                        .collect();
                    markup_lines.push(format!("| {} |", cells.join(" | ")));
                    let line = cells.join(" | ");
                    text_lines.push(line.clone());
                    page_lines.push(line);
                }
                BodyItem::PageBreak => {
                    markup_lines.push(PAGE_BREAK_MARKUP.to_string());
                    text_lines.push(PAGE_BREAK_CHAR.to_string());
                    flush_page(&mut page_lines, &mut pages);
                }
            }
        }
        flush_page(&mut page_lines, &mut pages);

        document.raw_text = text_lines.join("\n");
        let has_text = text_lines
            .iter()
            .any(|l| !l.trim_matches(|c: char| c.is_whitespace() || c == PAGE_BREAK_CHAR).is_empty());
        if !has_text {
            document.raw_text.clear();
        }
        document.markup = Some(markup_lines.join("\n")).filter(|m| !m.trim().is_empty());
        document.metadata.page_count = pages.len() as u32;
        document.metadata.has_tables = self.has_tables;
        document.metadata.has_images = self.has_images;
        document.pages = pages;
        document
    }
}
