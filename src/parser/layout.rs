//! Content-stream layout extraction for fixed-layout pages.
//!
//! Decodes positioned text fragments, ruling lines and image placements from a
//! page, then rebuilds visual lines so that table columns survive as wide gaps.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::{is_wide_char, TextFragment};

/// Separator inserted between fragments that are more than ~2 characters apart.
pub const COLUMN_GAP: &str = "  ";

/// Everything drawn on one page that layout analysis cares about.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    /// Text fragments in content-stream order
    pub fragments: Vec<TextFragment>,
    /// Stroked lines and thin filled rectangles
    pub rules: Vec<RuleLine>,
    /// Image XObject placements
    pub images: Vec<ImagePlacement>,
}

impl PageLayout {
    /// Horizontal rules long enough to be table borders.
    pub fn horizontal_rules(&self, min_length: f32) -> impl Iterator<Item = &RuleLine> {
        self.rules
            .iter()
            .filter(move |r| r.is_horizontal() && r.length() >= min_length)
    }
}

/// A straight line segment in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleLine {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RuleLine {
    /// Create a rule, ordering endpoints left-to-right then bottom-to-top.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        if (x0, y0) <= (x1, y1) {
            Self { x0, y0, x1, y1 }
        } else {
            Self {
                x0: x1,
                y0: y1,
                x1: x0,
                y1: y0,
            }
        }
    }

    pub fn length(&self) -> f32 {
        ((self.x1 - self.x0).powi(2) + (self.y1 - self.y0).powi(2)).sqrt()
    }

    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() <= 1.0 && (self.x1 - self.x0).abs() > 1.0
    }

    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() <= 1.0 && (self.y1 - self.y0).abs() > 1.0
    }
}

/// Where an image was painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A visual line: fragments sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The fragments in this line, sorted by X position
    pub fragments: Vec<TextFragment>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a new text line from fragments.
    pub fn from_fragments(mut fragments: Vec<TextFragment>) -> Self {
        fragments.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let total_chars: usize = fragments.iter().map(|f| f.text.chars().count()).sum();
        let weighted_size: f32 = fragments
            .iter()
            .map(|f| f.font_size * f.text.chars().count() as f32)
            .sum();
        let font_size = match (total_chars, fragments.first()) {
            (0, Some(first)) => first.font_size,
            (0, None) => 0.0,
            _ => weighted_size / total_chars as f32,
        };
        let (x, y) = fragments.first().map(|f| (f.x, f.y)).unwrap_or((0.0, 0.0));

        Self {
            fragments,
            y,
            x,
            font_size,
        }
    }

    /// Classify the horizontal gap before fragment `i`.
    fn gap_before(&self, i: usize) -> Gap {
        let prev = &self.fragments[i - 1];
        let curr = &self.fragments[i];
        let gap = curr.x - prev.right();
        let em = prev.font_size.max(curr.font_size).max(1.0);

        if gap >= em * 1.5 {
            return Gap::Column;
        }
        if gap <= em * 0.1 {
            return Gap::None;
        }
        let prev_wide = prev.text.chars().last().map(is_wide_char).unwrap_or(false);
        let curr_wide = curr.text.chars().next().map(is_wide_char).unwrap_or(false);
        if prev_wide && curr_wide {
            Gap::None
        } else {
            Gap::Space
        }
    }

    /// Combined text. Wide horizontal gaps become [`COLUMN_GAP`].
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                match self.gap_before(i) {
                    Gap::Column => {
                        let trimmed = result.trim_end().len();
                        result.truncate(trimmed);
                        result.push_str(COLUMN_GAP);
                    }
                    Gap::Space if !result.ends_with(' ') && !fragment.text.starts_with(' ') => {
                        result.push(' ')
                    }
                    _ => {}
                }
            }
            result.push_str(&fragment.text);
        }
        result
    }

    /// X positions where a new column starts (including the first fragment).
    pub fn column_starts(&self) -> Vec<f32> {
        let mut starts = Vec::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i == 0 || self.gap_before(i) == Gap::Column {
                starts.push(fragment.x);
            }
        }
        starts
    }

    /// Check if the line is predominantly bold.
    pub fn is_bold(&self) -> bool {
        let count = |bold: bool| -> usize {
            self.fragments
                .iter()
                .filter(|f| f.bold == bold)
                .map(|f| f.text.chars().count())
                .sum()
        };
        let bold = count(true);
        bold > 0 && bold >= count(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Column,
}

/// Group fragments into lines by baseline, top to bottom.
pub fn group_into_lines(fragments: Vec<TextFragment>) -> Vec<TextLine> {
    let mut fragments = fragments;
    // PDF Y grows upwards
    fragments.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextFragment> = Vec::new();
    let mut current_y: Option<f32> = None;

    for fragment in fragments {
        let tolerance = fragment.font_size * 0.3;
        match current_y {
            Some(y) if (fragment.y - y).abs() <= tolerance => current.push(fragment),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_fragments(std::mem::take(&mut current)));
                }
                current_y = Some(fragment.y);
                current.push(fragment);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_fragments(current));
    }

    lines
}

/// Render lines as page text, one visual line per text line.
pub fn lines_to_text(lines: &[TextLine]) -> String {
    lines
        .iter()
        .map(|l| l.text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts [`PageLayout`]s from a loaded document.
pub struct LayoutAnalyzer<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    /// Create a new layout analyzer.
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Decode one page's content stream.
    pub fn extract_page(&self, page_id: ObjectId) -> Result<PageLayout> {
        let lopdf_fonts = self.doc.get_page_fonts(page_id)?;

        let mut fonts = HashMap::new();
        for (name, font) in &lopdf_fonts {
            let base_font = font
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            fonts.insert(name.clone(), base_font);
        }

        let image_names = self.image_xobject_names(page_id);
        let content = self.page_content(page_id)?;
        self.parse_content(&content, &fonts, &lopdf_fonts, &image_names)
    }

    /// Concatenate the page's content streams.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without content is blank, not broken
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => Ok(stream_bytes(s)),
                Object::Array(arr) => Ok(self.concat_streams(arr)),
                _ => Err(Error::CorruptInput("invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(Error::CorruptInput("invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Ok(r) = obj.as_reference() {
                if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                    content.extend_from_slice(&stream_bytes(s));
                    content.push(b' ');
                }
            }
        }
        content
    }

    /// Resolve a dictionary that may be stored inline or by reference.
    fn resolve_dict<'b>(&'b self, obj: &'b Object) -> Option<&'b Dictionary> {
        match obj {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Names of image XObjects available to the page (resources may be inherited).
    fn image_xobject_names(&self, page_id: ObjectId) -> Vec<Vec<u8>> {
        let mut names = Vec::new();
        let mut node = self.doc.get_dictionary(page_id).ok();
        let mut depth = 0;

        while let Some(dict) = node {
            let xobjects = dict
                .get(b"Resources")
                .ok()
                .and_then(|r| self.resolve_dict(r))
                .and_then(|res| res.get(b"XObject").ok())
                .and_then(|x| self.resolve_dict(x));

            if let Some(xobjects) = xobjects {
                for (name, obj) in xobjects.iter() {
                    let is_image = obj
                        .as_reference()
                        .ok()
                        .and_then(|r| self.doc.get_object(r).ok())
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"Subtype").ok())
                        .and_then(|s| s.as_name_str().ok())
                        == Some("Image");
                    if is_image {
                        names.push(name.clone());
                    }
                }
                break;
            }

            depth += 1;
            if depth > 16 {
                break;
            }
            node = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| p.as_reference().ok())
                .and_then(|p| self.doc.get_dictionary(p).ok());
        }

        names
    }

    fn decode(&self, font: Option<&&Dictionary>, bytes: &[u8]) -> String {
        match font.and_then(|f| f.get_font_encoding(self.doc).ok()) {
            Some(encoding) => LopdfDocument::decode_text(&encoding, bytes).unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }

    fn parse_content(
        &self,
        content: &[u8],
        fonts: &HashMap<Vec<u8>, String>,
        lopdf_fonts: &BTreeMap<Vec<u8>, &Dictionary>,
        image_names: &[Vec<u8>],
    ) -> Result<PageLayout> {
        let content = lopdf::content::Content::decode(content)?;

        let mut layout = PageLayout::default();
        let mut current_font = String::new();
        let mut current_font_key: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut text_matrix = TextMatrix::default();
        let mut in_text_block = false;

        let mut ctm = Ctm::default();
        let mut ctm_stack: Vec<Ctm> = Vec::new();
        let mut path = PathBuilder::default();

        for op in content.operations {
            let num = |i: usize, default: f32| -> f32 {
                op.operands.get(i).and_then(get_number).unwrap_or(default)
            };

            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => ctm = ctm_stack.pop().unwrap_or_default(),
                "cm" if op.operands.len() >= 6 => {
                    let m = Ctm([
                        num(0, 1.0),
                        num(1, 0.0),
                        num(2, 0.0),
                        num(3, 1.0),
                        num(4, 0.0),
                        num(5, 0.0),
                    ]);
                    ctm = m.then(&ctm);
                }
                "m" => path.move_to(ctm.apply(num(0, 0.0), num(1, 0.0))),
                "l" => path.line_to(ctm.apply(num(0, 0.0), num(1, 0.0))),
                "re" => {
                    let (x, y, w, h) = (num(0, 0.0), num(1, 0.0), num(2, 0.0), num(3, 0.0));
                    path.rect(ctm.apply(x, y), ctm.apply(x + w, y + h));
                }
                "S" | "s" => path.commit(&mut layout.rules, true),
                "f" | "F" | "f*" => path.commit(&mut layout.rules, false),
                "B" | "B*" | "b" | "b*" => path.commit(&mut layout.rules, true),
                "n" => path.clear(),
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        if image_names.contains(name) {
                            let [a, _, _, d, e, f] = ctm.0;
                            layout.images.push(ImagePlacement {
                                x: e.min(e + a),
                                y: f.min(f + d),
                                width: a.abs(),
                                height: d.abs(),
                            });
                        }
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text_matrix = TextMatrix::default();
                }
                "ET" => in_text_block = false,
                "Tf" if op.operands.len() >= 2 => {
                    if let Object::Name(font_key) = &op.operands[0] {
                        current_font_key = font_key.clone();
                        current_font = fonts
                            .get(font_key.as_slice())
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(font_key).to_string());
                    }
                    current_font_size = num(1, 12.0);
                }
                "TL" => text_matrix.leading = num(0, 0.0),
                "Td" => text_matrix.translate(num(0, 0.0), num(1, 0.0)),
                "TD" => {
                    text_matrix.leading = -num(1, 0.0);
                    text_matrix.translate(num(0, 0.0), num(1, 0.0));
                }
                "Tm" if op.operands.len() >= 6 => text_matrix.set(
                    num(0, 1.0),
                    num(1, 0.0),
                    num(2, 0.0),
                    num(3, 1.0),
                    num(4, 0.0),
                    num(5, 0.0),
                ),
                "T*" => text_matrix.next_line(),
                "Tj" | "TJ" | "'" | "\"" if in_text_block => {
                    if op.operator == "'" || op.operator == "\"" {
                        text_matrix.next_line();
                    }
                    let font = lopdf_fonts.get(&current_font_key);
                    let text = match op.operator.as_str() {
                        "TJ" => match op.operands.first() {
                            Some(Object::Array(items)) => self.decode_tj(font, items),
                            _ => String::new(),
                        },
                        "\"" => match op.operands.get(2) {
                            Some(Object::String(bytes, _)) => self.decode(font, bytes),
                            _ => String::new(),
                        },
                        _ => match op.operands.first() {
                            Some(Object::String(bytes, _)) => self.decode(font, bytes),
                            _ => String::new(),
                        },
                    };

                    if !text.trim().is_empty() {
                        let (x, y) = text_matrix.position();
                        let size = current_font_size * text_matrix.scale();
                        let fragment = TextFragment::new(text, x, y, size, current_font.clone());
                        text_matrix.advance(fragment.width / text_matrix.scale().max(0.01));
                        layout.fragments.push(fragment);
                    }
                }
                _ => {}
            }
        }

        Ok(layout)
    }

    /// Decode a TJ array; large negative adjustments are word spaces.
    fn decode_tj(&self, font: Option<&&Dictionary>, items: &[Object]) -> String {
        // 1/1000 text space units
        const SPACE_THRESHOLD: f32 = 200.0;

        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(font, bytes)),
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = -get_number(item).unwrap_or(0.0);
                    let ends_spaceless = combined
                        .chars()
                        .last()
                        .map(|c| c.is_whitespace() || is_wide_char(c))
                        .unwrap_or(true);
                    if adjustment > SPACE_THRESHOLD && !ends_spaceless {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        combined
    }
}

/// Current transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ctm([f32; 6]);

impl Default for Ctm {
    fn default() -> Self {
        Ctm([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }
}

impl Ctm {
    /// `self × other`, the PDF concatenation order for `cm`.
    fn then(&self, other: &Ctm) -> Ctm {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Ctm([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

/// Pending path segments until a painting operator.
#[derive(Debug, Default)]
struct PathBuilder {
    current: Option<(f32, f32)>,
    segments: Vec<RuleLine>,
    rects: Vec<((f32, f32), (f32, f32))>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push(RuleLine::new(from.0, from.1, p.0, p.1));
        }
        self.current = Some(p);
    }

    fn rect(&mut self, p0: (f32, f32), p1: (f32, f32)) {
        self.rects.push((p0, p1));
    }

    fn clear(&mut self) {
        self.current = None;
        self.segments.clear();
        self.rects.clear();
    }

    /// Turn the pending path into rules. Filled rectangles only count when thin.
    fn commit(&mut self, rules: &mut Vec<RuleLine>, stroked: bool) {
        const THIN: f32 = 2.0;

        if stroked {
            rules.append(&mut self.segments);
        }
        for &((x0, y0), (x1, y1)) in &self.rects {
            let (w, h) = ((x1 - x0).abs(), (y1 - y0).abs());
            let mid_y = (y0 + y1) / 2.0;
            let mid_x = (x0 + x1) / 2.0;
            if h <= THIN && w > THIN {
                rules.push(RuleLine::new(x0, mid_y, x1, mid_y));
            } else if w <= THIN && h > THIN {
                rules.push(RuleLine::new(mid_x, y0, mid_x, y1));
            } else if stroked {
                rules.push(RuleLine::new(x0, y0, x1, y0));
                rules.push(RuleLine::new(x0, y1, x1, y1));
                rules.push(RuleLine::new(x0, y0, x0, y1));
                rules.push(RuleLine::new(x1, y0, x1, y1));
            }
        }
        self.clear();
    }
}

/// Text matrix for tracking position in content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    // Line start, restored by T* and Td
    line_e: f32,
    line_f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self.line_e = e;
        self.line_f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    /// Move along the baseline after showing text.
    fn advance(&mut self, tx: f32) {
        self.e += tx * self.a;
        self.f += tx * self.b;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Stream bytes; unfiltered streams are returned as stored.
fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
