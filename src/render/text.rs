//! Plain text rendering of block sequences.

use super::{layout, Emission, Segment};
use crate::error::Warning;
use crate::model::ContentBlock;
use crate::parser::PAGE_BREAK_CHAR;

/// Renders blocks as UTF-8 text, one block per line.
///
/// Page breaks are form feeds on their own line and table rows are cells
/// joined with ` | `.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEmitter;

impl TextEmitter {
    /// Create a text emitter.
    pub fn new() -> Self {
        Self
    }

    /// Render blocks to text.
    pub fn render(&self, blocks: &[ContentBlock]) -> (String, u32, Vec<Warning>) {
        let (segments, warnings) = layout(blocks);
        let mut lines: Vec<String> = Vec::with_capacity(segments.len());
        let mut page_count = 1;

        for segment in segments {
            match segment {
                Segment::PageBreak => {
                    page_count += 1;
                    lines.push(PAGE_BREAK_CHAR.to_string());
                }
                Segment::Block(block) | Segment::Degraded(block) => {
                    lines.push(block.text.clone());
                }
                Segment::Table(table) => {
                    lines.extend(table.rows.iter().map(|row| row.plain_text()));
                }
            }
        }

        (lines.join("\n"), page_count, warnings)
    }

    /// Render blocks to UTF-8 bytes.
    pub fn emit(&self, blocks: &[ContentBlock]) -> Emission {
        let (text, page_count, warnings) = self.render(blocks);
        Emission {
            bytes: text.into_bytes(),
            page_count,
            warnings,
        }
    }
}
