//! Fixed-layout (PDF) ingestion using lopdf.

use std::sync::Arc;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result, Warning};
use crate::model::{PageContent, ParsedDocument, SourceKind};

use super::docx::PAGE_BREAK_CHAR;
use super::layout::{group_into_lines, lines_to_text, LayoutAnalyzer, PageLayout, TextLine};
use super::options::{ErrorMode, IngestOptions};
use super::snapshot::{SnapshotBatch, SnapshotJob, SnapshotRenderer};
use super::table_detector::TableDetector;
use super::{IngestionAdapter, Ingestion};

/// A4 in points, used when a page has no usable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (595.0, 842.0);

/// Ingestion adapter for fixed-layout paginated documents.
#[derive(Debug, Clone, Default)]
pub struct PdfAdapter {
    options: IngestOptions,
    detector: TableDetector,
}

/// A page after layout extraction, before table detection.
struct ExtractedPage {
    content: PageContent,
    lines: Vec<TextLine>,
    layout: Arc<PageLayout>,
}

impl PdfAdapter {
    /// Create a new PDF adapter.
    pub fn new(options: IngestOptions) -> Self {
        Self {
            options,
            detector: TableDetector::new(),
        }
    }

    /// Use a custom table detector.
    pub fn with_detector(mut self, detector: TableDetector) -> Self {
        self.detector = detector;
        self
    }

    fn load(bytes: &[u8]) -> Result<LopdfDocument> {
        LopdfDocument::load_mem(bytes).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::from(e),
            other => Error::CorruptInput(format!("unreadable PDF: {}", other)),
        })
    }

    /// Extract one page; lenient mode turns decode failures into warnings.
    fn extract_page(
        &self,
        doc: &LopdfDocument,
        analyzer: &LayoutAnalyzer<'_>,
        page_num: u32,
        page_id: ObjectId,
        warnings: &mut Vec<Warning>,
    ) -> Result<ExtractedPage> {
        let (width, height) = page_dimensions(doc, page_id);
        let mut content = PageContent::new(page_num, width, height);

        let layout = match analyzer.extract_page(page_id) {
            Ok(layout) => layout,
            Err(e) => {
                if self.options.error_mode == ErrorMode::Strict {
                    return Err(Error::CorruptInput(format!("page {}: {}", page_num, e)));
                }
                log::warn!("Failed to read page {}: {}", page_num, e);
                warnings.push(Warning::PageUnreadable {
                    page: page_num,
                    reason: e.to_string(),
                });
                return Ok(ExtractedPage {
                    content,
                    lines: Vec::new(),
                    layout: Arc::new(PageLayout::default()),
                });
            }
        };

        let lines = group_into_lines(layout.fragments.clone());
        content.raw_text = lines_to_text(&lines);

        if content.raw_text.trim().is_empty() {
            // Nothing positioned survived decoding; lopdf's own extractor may still find text
            if let Ok(text) = doc.extract_text(&[page_num]) {
                content.raw_text = text
                    .lines()
                    .map(str::trim_end)
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
        content.fragments = layout.fragments.clone();

        Ok(ExtractedPage {
            content,
            lines,
            layout: Arc::new(layout),
        })
    }

    fn render_snapshots(&self, pages: &[ExtractedPage]) -> SnapshotBatch {
        if !self.options.render_snapshots {
            return SnapshotBatch::default();
        }
        let renderer = SnapshotRenderer::new(
            self.options.snapshot_workers,
            self.options.page_render_budget,
            self.options.snapshot_scale,
        );
        let jobs = pages
            .iter()
            .map(|p| SnapshotJob {
                page: p.content.number,
                width: p.content.width,
                height: p.content.height,
                layout: Arc::clone(&p.layout),
            })
            .collect();
        renderer.render_all(jobs)
    }
}

impl IngestionAdapter for PdfAdapter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::FixedLayout
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<Ingestion> {
        let doc = Self::load(bytes)?;
        let analyzer = LayoutAnalyzer::new(&doc);
        let mut warnings = Vec::new();

        let mut document = ParsedDocument::new(SourceKind::FixedLayout, file_name);
        extract_metadata(&doc, &mut document);

        let page_ids = doc.get_pages();
        document.metadata.page_count = page_ids.len() as u32;

        let mut pages = Vec::new();
        for (&page_num, &page_id) in page_ids.iter() {
            if !self.options.pages.includes(page_num) {
                continue;
            }
            pages.push(self.extract_page(&doc, &analyzer, page_num, page_id, &mut warnings)?);
        }

        let batch = self.render_snapshots(&pages);
        warnings.extend(batch.warnings.iter().cloned());

        for page in &pages {
            let snapshot = batch.images.get(&page.content.number);
            let evidence = self.detector.detect(&page.lines, &page.layout, snapshot);
            document.metadata.has_tables |= evidence.is_table();
            document.metadata.has_images |= !page.layout.images.is_empty();
        }

        let separator = format!("\n{}\n", PAGE_BREAK_CHAR);
        document.raw_text = pages
            .iter()
            .map(|p| p.content.raw_text.as_str())
            .collect::<Vec<_>>()
            .join(&separator);
        let blank = |c: char| c.is_whitespace() || c == PAGE_BREAK_CHAR;
        if document.raw_text.trim_matches(blank).is_empty() {
            document.raw_text.clear();
        }
        document.pages = pages.into_iter().map(|p| p.content).collect();

        log::debug!(
            "PDF '{}': {} of {} pages, tables={}, images={}, {} warnings",
            file_name,
            document.pages.len(),
            document.metadata.page_count,
            document.metadata.has_tables,
            document.metadata.has_images,
            warnings.len()
        );

        if document.is_empty() {
            if self.options.error_mode == ErrorMode::Strict {
                return Err(Error::EmptyContent);
            }
            log::warn!("PDF '{}' contains no extractable text", file_name);
            warnings.push(Warning::EmptyContent);
        }

        Ok(Ingestion { document, warnings })
    }
}

/// Title and author from the Info dictionary.
fn extract_metadata(doc: &LopdfDocument, document: &mut ParsedDocument) {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            Object::Reference(r) => doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        });

    if let Some(info) = info {
        let present = |s: &String| !s.trim().is_empty();
        document.metadata.title = get_string_from_dict(info, b"Title").filter(present);
        document.metadata.author = get_string_from_dict(info, b"Author").filter(present);
    }
}

/// Page size from the (possibly inherited) MediaBox.
fn page_dimensions(doc: &LopdfDocument, page_id: ObjectId) -> (f32, f32) {
    let mut node = doc.get_dictionary(page_id).ok();
    let mut depth = 0;

    while let Some(dict) = node {
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let array = match media_box {
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_array().ok()),
                other => other.as_array().ok(),
            };
            if let Some(array) = array.filter(|a| a.len() >= 4) {
                let n: Vec<f32> = array.iter().map(|o| o.as_float().unwrap_or(0.0)).collect();
                let (width, height) = ((n[2] - n[0]).abs(), (n[3] - n[1]).abs());
                if width > 0.0 && height > 0.0 {
                    return (width, height);
                }
            }
        }

        depth += 1;
        if depth > 16 {
            break;
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|p| doc.get_dictionary(p).ok());
    }

    DEFAULT_PAGE_SIZE
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(super::layout::decode_text_simple(bytes)),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{build_pdf, build_pdf_streams, text_ops};
    use super::*;
    use lopdf::content::Operation;
    use crate::parser::PageSelection;

    fn adapter() -> PdfAdapter {
        PdfAdapter::new(IngestOptions::new().with_snapshot_workers(2))
    }

    #[test]
    fn test_parse_pages_text_and_tables() {
        let bytes = build_pdf(&[
            vec![
                ("SERVICE CONTRACT", 200.0, 780.0),
                ("Party A: [Client Name]", 72.0, 740.0),
                ("Item", 72.0, 700.0),
                ("Qty", 250.0, 700.0),
                ("Price", 400.0, 700.0),
                ("Design", 72.0, 680.0),
                ("1", 250.0, 680.0),
                ("{{Service Fee}}", 400.0, 680.0),
            ],
            vec![("Signed on ${Sign Date}", 72.0, 740.0)],
        ]);

        let ingestion = adapter().parse(&bytes, "contract.pdf").unwrap();
        let doc = ingestion.document;

        assert_eq!(doc.source_kind, SourceKind::FixedLayout);
        assert_eq!(doc.metadata.page_count, 2);
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].dimensions(), (595.0, 842.0));
        assert!(doc.metadata.has_tables);
        assert!(!doc.metadata.has_images);

        let page1: Vec<&str> = doc.pages[0].raw_text.lines().collect();
        assert_eq!(page1[0], "SERVICE CONTRACT");
        assert_eq!(page1[1], "Party A: [Client Name]");
        assert_eq!(page1[2], "Item  Qty  Price");
        assert!(doc.pages[1].raw_text.contains("${Sign Date}"));
        assert!(doc.raw_text.contains(PAGE_BREAK_CHAR));
        assert!(!doc.pages[0].fragments.is_empty());
    }

    #[test]
    fn test_page_selection() {
        let bytes = build_pdf(&[vec![("one", 72.0, 700.0)], vec![("two", 72.0, 700.0)]]);
        let adapter = PdfAdapter::new(
            IngestOptions::new()
                .with_snapshots(false)
                .with_pages(PageSelection::Pages(vec![2])),
        );
        let doc = adapter.parse(&bytes, "x.pdf").unwrap().document;
        assert_eq!(doc.metadata.page_count, 2);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].number, 2);
        assert_eq!(doc.raw_text, "two");
    }

    #[test]
    fn test_blank_pdf_is_soft_empty_in_lenient_mode() {
        let bytes = build_pdf(&[vec![]]);
        let ingestion = adapter().parse(&bytes, "blank.pdf").unwrap();
        assert!(ingestion.document.is_empty());
        assert!(ingestion.warnings.contains(&Warning::EmptyContent));

        let strict = PdfAdapter::new(IngestOptions::new().strict().with_snapshots(false));
        assert!(matches!(
            strict.parse(&bytes, "blank.pdf"),
            Err(Error::EmptyContent)
        ));
    }

    #[test]
    fn test_garbage_is_corrupt_input() {
        let result = adapter().parse(b"%PDF-1.4\nthis is not a pdf", "bad.pdf");
        assert!(matches!(result, Err(Error::CorruptInput(_))));
    }

    #[test]
    fn test_unfiltered_content_streams_are_read() {
        let bytes = build_pdf_streams(&[
            vec![text_ops("Party A: [Client Name]", 72.0, 740.0)],
            vec![
                text_ops("Article 1", 72.0, 740.0),
                text_ops("Fee: {{Service Fee}}", 72.0, 720.0),
            ],
        ]);
        let doc = LopdfDocument::load_mem(&bytes).unwrap();
        let first_page = doc.get_pages()[&1];
        let contents = doc.get_dictionary(first_page).unwrap().get(b"Contents").unwrap();
        let stream = doc
            .get_object(contents.as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(stream.dict.get(b"Filter").is_err());

        let ingestion = adapter().parse(&bytes, "plain.pdf").unwrap();
        assert!(!ingestion
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::PageUnreadable { .. })));
        let pages = &ingestion.document.pages;
        assert_eq!(pages[0].raw_text, "Party A: [Client Name]");
        // Contents array with two streams
        assert_eq!(pages[1].raw_text, "Article 1\nFee: {{Service Fee}}");
    }

    #[test]
    fn test_text_without_fragments_uses_extractor() {
        // Text shown outside BT/ET yields no positioned fragments
        let bytes = build_pdf_streams(&[vec![vec![
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Tj", vec![Object::string_literal("Loose text")]),
        ]]]);

        let ingestion = adapter().parse(&bytes, "loose.pdf").unwrap();
        let page = &ingestion.document.pages[0];
        assert!(page.fragments.is_empty());
        assert!(page.raw_text.contains("Loose text"));
        assert!(!ingestion.warnings.contains(&Warning::EmptyContent));
    }
}
