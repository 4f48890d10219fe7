//! Classified content blocks.

use serde::{Deserialize, Serialize};

/// The structural role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Document title (e.g. "房屋租赁合同")
    Title,
    /// Chapter or section heading
    SectionHeader,
    /// Top-level clause ("第一条 ...", "1. ...")
    Clause,
    /// Nested clause ("1.1 ...", "（一）...", "a) ...")
    SubClause,
    /// Body text
    Paragraph,
    /// One row of a table
    TableRow,
}

impl BlockType {
    /// Heading level used when this block is emitted, if it is a heading.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            BlockType::Title => Some(1),
            BlockType::SectionHeader => Some(2),
            BlockType::SubClause => Some(3),
            _ => None,
        }
    }

    /// Whether the block carries structure (anything but paragraphs).
    pub fn is_structural(self) -> bool {
        !matches!(self, BlockType::Paragraph | BlockType::TableRow)
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

/// Visual style attached to a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStyle {
    /// Font size in points
    pub font_size: f32,
    /// Bold text
    pub bold: bool,
    /// Paragraph alignment
    pub alignment: Alignment,
}

impl BlockStyle {
    /// Body size the per-type defaults are expressed against.
    pub const BASE_FONT_SIZE: f32 = 12.0;

    /// Default style for a block type.
    pub fn for_type(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Title => Self {
                font_size: 18.0,
                bold: true,
                alignment: Alignment::Center,
            },
            BlockType::SectionHeader => Self {
                font_size: 14.0,
                bold: true,
                alignment: Alignment::Left,
            },
            BlockType::SubClause => Self {
                font_size: 12.0,
                bold: false,
                alignment: Alignment::Left,
            },
            BlockType::Clause | BlockType::Paragraph => Self {
                font_size: 12.0,
                bold: false,
                alignment: Alignment::Justify,
            },
            BlockType::TableRow => Self {
                font_size: 10.5,
                bold: false,
                alignment: Alignment::Left,
            },
        }
    }
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self::for_type(BlockType::Paragraph)
    }
}

/// Estimated placement of a block on its page, in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPosition {
    /// Left edge
    pub x: f32,
    /// Top edge, increasing down the page
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

/// A classified unit of document content.
///
/// Block order is significant: documents are reconstructed strictly in
/// sequence, grouped by `page_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Structural role
    #[serde(rename = "type")]
    pub block_type: BlockType,

    /// Text content
    pub text: String,

    /// Visual style
    pub style: BlockStyle,

    /// Estimated position
    pub position: BlockPosition,

    /// Page number (1-indexed)
    pub page_number: u32,
}

impl ContentBlock {
    /// Create a block with the default style for its type.
    pub fn new(block_type: BlockType, text: impl Into<String>, page_number: u32) -> Self {
        Self {
            block_type,
            text: text.into(),
            style: BlockStyle::for_type(block_type),
            position: BlockPosition::default(),
            page_number,
        }
    }

    /// Create a paragraph block on page 1.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockType::Paragraph, text, 1)
    }

    /// Set the position and return self.
    pub fn at(mut self, position: BlockPosition) -> Self {
        self.position = position;
        self
    }

    /// Whether the block holds no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Check if this block is a heading.
    pub fn is_heading(&self) -> bool {
        self.block_type.heading_level().is_some()
    }
}
