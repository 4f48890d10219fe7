//! Page-level types.

use serde::{Deserialize, Serialize};

/// Content of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page text, one line per visual line
    pub raw_text: String,

    /// Positioned text fragments (empty for flowed sources)
    pub fragments: Vec<TextFragment>,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,
}

impl PageContent {
    /// Create a new page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            raw_text: String::new(),
            fragments: Vec::new(),
            width,
            height,
        }
    }

    /// Create a new A4 page (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0)
    }

    /// Whether the page carries no text.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A run of text pinned to page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// The text content
    pub text: String,
    /// X position (left edge) in points
    pub x: f32,
    /// Y position (baseline) in points, PDF orientation (origin bottom-left)
    pub y: f32,
    /// Estimated advance width in points
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g., "SimSun-Bold")
    pub font_name: String,
    /// Whether the font looks bold
    pub bold: bool,
}

impl TextFragment {
    /// Create a fragment, estimating its width from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32, font_name: impl Into<String>) -> Self {
        let text = text.into();
        let font_name = font_name.into();
        let lower = font_name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let width = estimate_width(&text, font_size);

        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
            bold,
        }
    }

    /// Right edge of the fragment.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top of the fragment (approximate ascender).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    /// Bottom of the fragment (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }
}

/// Wide glyphs take a full em, everything else roughly half.
fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|c| if is_wide_char(c) { font_size } else { font_size * 0.5 })
        .sum()
}

/// Check if a character is rendered full-width (CJK ideographs, kana, full-width forms).
pub(crate) fn is_wide_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
        || (0x3040..=0x30FF).contains(&code)
        || (0xFF00..=0xFFEF).contains(&code)
        || (0x20000..=0x2A6DF).contains(&code)
}
