//! DOCX emission using docx-rs.

use std::io::Cursor;

use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, PageMargin, Paragraph, Run, RunFonts,
    SpecialIndentType, Style, StyleType, Table as DocxTable, TableCell as DocxCell,
    TableRow as DocxRow,
};

use super::{layout, Emission, GenerationOptions, Segment};
use crate::error::{Error, Result};
use crate::model::{Alignment, BlockStyle, BlockType, ContentBlock, Table};

/// Heading style ids, indexed by heading level - 1.
const HEADING_STYLES: [(&str, &str, BlockType); 3] = [
    ("Heading1", "Heading 1", BlockType::Title),
    ("Heading2", "Heading 2", BlockType::SectionHeader),
    ("Heading3", "Heading 3", BlockType::SubClause),
];

/// Builds a word-processor document from blocks.
///
/// Titles, section headers and sub-clauses become `Heading1..3` paragraphs.
/// Clauses and paragraphs are body text with a two-character first-line
/// indent. Consecutive table rows become one table.
#[derive(Debug, Clone, Copy)]
pub struct DocxEmitter<'a> {
    options: &'a GenerationOptions,
}

impl<'a> DocxEmitter<'a> {
    /// Create an emitter for one request's options.
    pub fn new(options: &'a GenerationOptions) -> Self {
        Self { options }
    }

    /// Emit `blocks` as DOCX bytes.
    ///
    /// An empty block list yields a valid empty document. Table rows that
    /// cannot be split into cells are written as plain paragraphs and
    /// reported in [`Emission::warnings`].
    pub fn emit(&self, blocks: &[ContentBlock]) -> Result<Emission> {
        let (segments, warnings) = layout(blocks);
        let mut docx = self.document();
        let mut page_count = 1;

        for segment in &segments {
            docx = match segment {
                Segment::PageBreak => {
                    page_count += 1;
                    docx.add_paragraph(
                        Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
                    )
                }
                Segment::Block(block) => docx.add_paragraph(self.block_paragraph(block)),
                Segment::Table(table) => docx.add_table(self.table(table)),
                Segment::Degraded(block) => docx.add_paragraph(
                    Paragraph::new()
                        .add_run(self.run(&block.text, &BlockStyle::for_type(block.block_type)))
                        .line_spacing(self.line_spacing()),
                ),
            };
        }

        let mut buffer = Vec::new();
        docx.build()
            .pack(&mut Cursor::new(&mut buffer))
            .map_err(|e| Error::Emission(format!("failed to pack DOCX: {}", e)))?;

        log::debug!(
            "DocxEmitter: {} blocks -> {} segments, {} pages, {} bytes",
            blocks.len(),
            segments.len(),
            page_count,
            buffer.len()
        );

        Ok(Emission {
            bytes: buffer,
            page_count,
            warnings,
        })
    }

    /// Empty document with page setup, fonts and heading styles.
    fn document(&self) -> Docx {
        let (width, height) = self.options.page_size_twips();
        let margins = self.options.margins;

        let mut docx = Docx::new()
            .page_size(width, height)
            .page_margin(
                PageMargin::new()
                    .top(margins.top as _)
                    .right(margins.right as _)
                    .bottom(margins.bottom as _)
                    .left(margins.left as _),
            )
            .default_fonts(self.fonts())
            .default_size(half_points(self.options.font_size));

        for (id, name, block_type) in HEADING_STYLES {
            let style = BlockStyle::for_type(block_type);
            let mut heading = Style::new(id, StyleType::Paragraph)
                .name(name)
                .fonts(self.fonts())
                .size(half_points(self.scaled(style.font_size)));
            if style.bold {
                heading = heading.bold();
            }
            docx = docx.add_style(heading);
        }
        docx
    }

    fn fonts(&self) -> RunFonts {
        let family = self.options.font_family.as_str();
        RunFonts::new()
            .ascii(family)
            .hi_ansi(family)
            .east_asia(family)
    }

    fn line_spacing(&self) -> LineSpacing {
        LineSpacing::new().line(self.options.line_spacing_units() as _)
    }

    /// Two characters of the base font, in twips.
    fn first_line_indent(&self) -> i32 {
        (self.options.font_size * 40.0).round() as i32
    }

    /// Block sizes are relative to a 12pt body; rescale to the requested base.
    fn scaled(&self, points: f32) -> f32 {
        points * self.options.font_size / BlockStyle::BASE_FONT_SIZE
    }

    fn run(&self, text: &str, style: &BlockStyle) -> Run {
        let mut run = Run::new()
            .add_text(text)
            .size(half_points(self.scaled(style.font_size)))
            .fonts(self.fonts());
        if style.bold {
            run = run.bold();
        }
        run
    }

    fn block_paragraph(&self, block: &ContentBlock) -> Paragraph {
        let defaults = BlockStyle::for_type(block.block_type);
        let style = if self.options.preserve_formatting {
            &block.style
        } else {
            &defaults
        };

        let run = if self.options.preserve_formatting {
            self.run(&block.text, style)
        } else {
            // Size and weight come from the paragraph style or the document default
            Run::new().add_text(&block.text)
        };

        let mut paragraph = Paragraph::new()
            .add_run(run)
            .align(alignment_type(style.alignment))
            .line_spacing(self.line_spacing());

        match block.block_type.heading_level() {
            Some(level) => {
                let (id, _, _) = HEADING_STYLES[usize::from(level) - 1];
                paragraph = paragraph.style(id);
            }
            None if matches!(block.block_type, BlockType::Clause | BlockType::Paragraph) => {
                paragraph = paragraph.indent(
                    None,
                    Some(SpecialIndentType::FirstLine(self.first_line_indent())),
                    None,
                    None,
                );
            }
            None => {}
        }
        paragraph
    }

    fn table(&self, table: &Table) -> DocxTable {
        let style = BlockStyle::for_type(BlockType::TableRow);
        let rows = table
            .rows
            .iter()
            .map(|row| {
                let cells = row
                    .cells
                    .iter()
                    .map(|cell| {
                        DocxCell::new().add_paragraph(
                            Paragraph::new()
                                .add_run(self.run(&cell.text, &style))
                                .align(alignment_type(cell.alignment)),
                        )
                    })
                    .collect();
                DocxRow::new(cells)
            })
            .collect();
        DocxTable::new(rows)
    }
}

fn half_points(points: f32) -> usize {
    (points * 2.0).round().max(2.0) as usize
}

fn alignment_type(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justify => AlignmentType::Both,
    }
}
