//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Route library logs to the test output.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Body elements of a synthetic DOCX.
pub enum Para<'a> {
    /// Paragraph with an optional style id
    Text(Option<&'a str>, &'a str),
    /// Paragraph with `w:jc` alignment and optional bold runs
    Aligned(&'a str, bool, &'a str),
    /// Table row
    Row(&'a [&'a str]),
    /// Explicit page break
    PageBreak,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build a DOCX package from body elements.
pub fn build_docx(body: &[Para<'_>]) -> Vec<u8> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );
    let mut in_table = false;
    for item in body {
        if in_table && !matches!(item, Para::Row(_)) {
            xml.push_str("</w:tbl>");
            in_table = false;
        }
        match item {
            Para::Text(style, text) => {
                xml.push_str("<w:p>");
                if let Some(style) = style {
                    xml.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style));
                }
                xml.push_str(&format!("<w:r><w:t>{}</w:t></w:r></w:p>", escape(text)));
            }
            Para::Aligned(jc, bold, text) => {
                let run_props = if *bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
                xml.push_str(&format!(
                    r#"<w:p><w:pPr><w:jc w:val="{}"/></w:pPr><w:r>{}<w:t>{}</w:t></w:r></w:p>"#,
                    jc,
                    run_props,
                    escape(text)
                ));
            }
            Para::Row(cells) => {
                if !in_table {
                    xml.push_str("<w:tbl>");
                    in_table = true;
                }
                xml.push_str("<w:tr>");
                for cell in cells.iter() {
                    xml.push_str(&format!(
                        "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                        escape(cell)
                    ));
                }
                xml.push_str("</w:tr>");
            }
            Para::PageBreak => {
                xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
            }
        }
    }
    if in_table {
        xml.push_str("</w:tbl>");
    }
    xml.push_str("</w:body></w:document>");

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Read `word/document.xml` out of a DOCX package.
pub fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

/// Build a ZIP that is not a word-processing package.
pub fn build_plain_zip() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("readme.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"not a document").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Build a PDF whose pages show `(text, x, y)` runs in Helvetica 12pt.
pub fn build_pdf(pages: &[Vec<(&str, f32, f32)>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for runs in pages {
        let mut operations = Vec::new();
        for (text, x, y) in runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ));
            operations.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
