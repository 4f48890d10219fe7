//! Source format detection.
//!
//! Magic bytes decide the source kind. The file name is only consulted to
//! produce a precise `UnsupportedFormat` message for inputs we recognize but
//! do not handle.

use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::SourceKind;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// ZIP local file header (OOXML containers).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// OLE2 compound document (legacy .doc, .xls).
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const FLOWED_EXTENSIONS: &[&str] = &["docx", "docm", "dotx"];
const FIXED_LAYOUT_EXTENSIONS: &[&str] = &["pdf"];

/// Detect the source kind of an uploaded document.
///
/// # Arguments
/// * `data` - The full document bytes
/// * `file_name` - The declared file name (may be empty)
///
/// # Returns
/// * `Ok(SourceKind)` when the bytes are a DOCX or PDF document
/// * `Err(Error::UnsupportedFormat)` otherwise
pub fn detect_source_kind(data: &[u8], file_name: &str) -> Result<SourceKind> {
    if data.starts_with(PDF_MAGIC) {
        return Ok(SourceKind::FixedLayout);
    }

    if data.starts_with(ZIP_MAGIC) {
        if is_wordprocessing_container(data) {
            return Ok(SourceKind::Flowed);
        }
        return Err(Error::UnsupportedFormat(format!(
            "{}: ZIP container without word/document.xml",
            display_name(file_name)
        )));
    }

    if data.starts_with(OLE2_MAGIC) {
        return Err(Error::UnsupportedFormat(format!(
            "{}: legacy binary Word documents are not supported, save as .docx",
            display_name(file_name)
        )));
    }

    if let Some(kind) = source_kind_from_name(file_name) {
        // Right extension, wrong bytes.
        return Err(Error::CorruptInput(format!(
            "{}: content does not match the {} format",
            display_name(file_name),
            mime_type(kind)
        )));
    }

    match extension_of(file_name) {
        Some(ext) => Err(Error::UnsupportedFormat(format!(
            "{}: extension .{} is not supported",
            display_name(file_name),
            ext
        ))),
        None => Err(Error::UnsupportedFormat(format!(
            "{}: unrecognized content",
            display_name(file_name)
        ))),
    }
}

/// Guess the source kind from the file name alone.
pub fn source_kind_from_name(file_name: &str) -> Option<SourceKind> {
    let ext = extension_of(file_name)?;
    if FLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Flowed)
    } else if FIXED_LAYOUT_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::FixedLayout)
    } else {
        None
    }
}

/// MIME type of a source kind.
pub fn mime_type(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Flowed => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        SourceKind::FixedLayout => "application/pdf",
    }
}

fn is_wordprocessing_container(data: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(data))
        .map(|archive| archive.file_names().any(|name| name == "word/document.xml"))
        .unwrap_or(false)
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn display_name(file_name: &str) -> &str {
    if file_name.is_empty() {
        "<unnamed>"
    } else {
        file_name
    }
}
