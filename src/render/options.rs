//! Generation options.

use serde::{Deserialize, Serialize};

/// Twips per point.
pub const TWIPS_PER_POINT: f32 = 20.0;

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word-processor document
    #[default]
    Docx,
    /// UTF-8 plain text
    Text,
}

impl OutputFormat {
    /// MIME type of the emitted bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Text => "text/plain; charset=utf-8",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Text => "txt",
        }
    }
}

/// Page margins in twips (1/20 point).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    /// Top margin
    pub top: u32,
    /// Right margin
    pub right: u32,
    /// Bottom margin
    pub bottom: u32,
    /// Left margin
    pub left: u32,
}

impl PageMargins {
    /// The same margin on every side.
    pub fn uniform(twips: u32) -> Self {
        Self {
            top: twips,
            right: twips,
            bottom: twips,
            left: twips,
        }
    }
}

impl Default for PageMargins {
    fn default() -> Self {
        // 2.54 cm top/bottom, 3.17 cm left/right
        Self {
            top: 1440,
            right: 1800,
            bottom: 1440,
            left: 1800,
        }
    }
}

/// Per-request options for document regeneration.
///
/// Built once per request and passed by reference; nothing here is global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Page margins
    pub margins: PageMargins,

    /// Font family for body and headings
    pub font_family: String,

    /// Base font size in points
    pub font_size: f32,

    /// Line spacing multiplier (1.0 = single)
    pub line_spacing: f32,

    /// Use each block's own style instead of the per-type defaults
    pub preserve_formatting: bool,

    /// Output format
    pub output_format: OutputFormat,

    /// Page size in points; `None` uses A4
    pub page_size: Option<(f32, f32)>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            margins: PageMargins::default(),
            font_family: "SimSun".to_string(),
            font_size: 12.0,
            line_spacing: 1.5,
            preserve_formatting: true,
            output_format: OutputFormat::Docx,
            page_size: None,
        }
    }
}

impl GenerationOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page margins.
    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }

    /// Set the font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Set the base font size in points.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size.clamp(6.0, 72.0);
        self
    }

    /// Set the line spacing multiplier.
    pub fn with_line_spacing(mut self, multiplier: f32) -> Self {
        self.line_spacing = multiplier.clamp(0.5, 5.0);
        self
    }

    /// Keep or drop per-block styles.
    pub fn with_preserve_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// Set the output format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the page size in points.
    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_size = Some((width, height));
        self
    }

    /// Page size in twips, A4 when unset.
    pub fn page_size_twips(&self) -> (u32, u32) {
        let (width, height) = self.page_size.unwrap_or((595.0, 842.0));
        (
            (width * TWIPS_PER_POINT).round() as u32,
            (height * TWIPS_PER_POINT).round() as u32,
        )
    }

    /// Line spacing in 240ths of a line.
    pub fn line_spacing_units(&self) -> u32 {
        (self.line_spacing * 240.0).round() as u32
    }
}
