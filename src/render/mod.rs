//! Document reconstruction from classified blocks.
//!
//! [`emit`] turns an ordered block sequence into output bytes. Blocks are
//! first laid out into segments (paragraphs, tables, page breaks) so every
//! output format shares the same grouping and degradation rules.

mod docx;
mod json;
mod options;
mod result;
mod table;
mod text;

pub use docx::DocxEmitter;
pub use json::{to_json, JsonFormat};
pub use options::{GenerationOptions, OutputFormat, PageMargins, TWIPS_PER_POINT};
pub use result::{
    count_block_words, count_words, GenerationMetadata, GenerationPath, GenerationResult,
};
pub use table::{build_table, split_row};
pub use text::TextEmitter;

use crate::error::{Result, Warning};
use crate::model::{BlockType, ContentBlock, Table};

/// Bytes produced by one emission.
#[derive(Debug, Clone, Default)]
pub struct Emission {
    /// Output document bytes
    pub bytes: Vec<u8>,
    /// Pages in the output
    pub page_count: u32,
    /// Blocks that were degraded instead of failing the document
    pub warnings: Vec<Warning>,
}

/// Emit `blocks` in the format selected by `options`.
pub fn emit(blocks: &[ContentBlock], options: &GenerationOptions) -> Result<Emission> {
    match options.output_format {
        OutputFormat::Docx => DocxEmitter::new(options).emit(blocks),
        OutputFormat::Text => Ok(TextEmitter::new().emit(blocks)),
    }
}

/// One unit of output, in block order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment<'a> {
    /// Start a new page
    PageBreak,
    /// A heading or body block
    Block(&'a ContentBlock),
    /// Consecutive table rows on one page
    Table(Table),
    /// A table row whose text could not be split into cells
    Degraded(&'a ContentBlock),
}

/// Group blocks into segments.
///
/// A page break is inserted whenever the page number increases. Table rows
/// that cannot be split degrade to single-cell paragraphs and are reported.
pub(crate) fn layout(blocks: &[ContentBlock]) -> (Vec<Segment<'_>>, Vec<Warning>) {
    let mut segments = Vec::with_capacity(blocks.len());
    let mut warnings = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut page = blocks.first().map_or(1, |b| b.page_number);

    for (index, block) in blocks.iter().enumerate() {
        if block.page_number > page {
            flush_rows(&mut rows, &mut segments);
            segments.push(Segment::PageBreak);
            page = block.page_number;
        }

        if block.block_type == BlockType::TableRow {
            match split_row(&block.text) {
                Some(cells) => rows.push(cells),
                None => {
                    flush_rows(&mut rows, &mut segments);
                    let warning = Warning::EmissionPartialFailure {
                        block_index: index,
                        reason: "table row has no separable cells".to_string(),
                    };
                    log::warn!("{}", warning);
                    warnings.push(warning);
                    segments.push(Segment::Degraded(block));
                }
            }
            continue;
        }

        flush_rows(&mut rows, &mut segments);
        if !block.is_empty() {
            segments.push(Segment::Block(block));
        }
    }
    flush_rows(&mut rows, &mut segments);

    (segments, warnings)
}

fn flush_rows(rows: &mut Vec<Vec<String>>, segments: &mut Vec<Segment<'_>>) {
    if !rows.is_empty() {
        segments.push(Segment::Table(build_table(std::mem::take(rows))));
    }
}
