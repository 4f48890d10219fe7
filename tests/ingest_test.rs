//! Integration tests for the parse phase.

mod common;

use common::{build_docx, build_pdf, build_plain_zip, init_logger, Para};
use pretty_assertions::assert_eq;
use retemplate::{
    parse_bytes, parse_bytes_with_options, parse_file, BlockType, Error, IngestOptions,
    JsonFormat, SourceKind, TemplateEngine, TemplateRecord, ValueType, Warning,
};

fn lease_docx() -> Vec<u8> {
    build_docx(&[
        Para::Text(Some("Title"), "房屋租赁合同"),
        Para::Text(None, "甲方：[甲方名称]"),
        Para::Text(None, "第一条 租金"),
        Para::Text(None, "月租金为人民币{{月租金}}元，按月支付。"),
        Para::Row(&["名称", "数量"]),
        Para::Row(&["空调", "2"]),
        Para::PageBreak,
        Para::Text(None, "签订日期：${签订日期}"),
    ])
}

#[test]
fn test_ingest_docx_structure_and_variables() {
    let outcome = parse_bytes(&lease_docx(), "lease.docx").unwrap();
    let record = &outcome.record;

    assert_eq!(record.source_kind, SourceKind::Flowed);
    assert_eq!(record.id, "lease.docx");
    assert!(record.metadata.has_tables);
    assert!(record.page_size.is_none());

    let types: Vec<BlockType> = record.blocks.iter().map(|b| b.block_type).collect();
    assert_eq!(
        types,
        vec![
            BlockType::Title,
            BlockType::Paragraph,
            BlockType::SectionHeader,
            BlockType::Paragraph,
            BlockType::TableRow,
            BlockType::TableRow,
            BlockType::Paragraph,
        ]
    );
    assert_eq!(record.blocks[4].text, "名称 | 数量");
    assert_eq!(record.blocks.last().unwrap().page_number, 2);

    let names: Vec<(&str, ValueType)> = outcome
        .variables
        .iter()
        .map(|v| (v.name.as_str(), v.value_type))
        .collect();
    assert_eq!(
        names,
        vec![
            ("甲方名称", ValueType::Text),
            ("月租金", ValueType::Currency),
            ("签订日期", ValueType::Date),
        ]
    );
    assert_eq!(outcome.placeholders.len(), 3);
    assert!(outcome.placeholders.iter().all(|p| p.required));
    assert_eq!(outcome.placeholders[1].position.block_index, Some(3));
}

#[test]
fn test_ingest_pdf_pages() {
    init_logger();
    let bytes = build_pdf(&[
        vec![
            ("SERVICE AGREEMENT", 200.0, 780.0),
            ("Party A: [Client Name]", 72.0, 740.0),
            ("Fee: {{Service Fee}}", 72.0, 720.0),
        ],
        vec![("Signed on ${Sign Date}", 72.0, 740.0)],
    ]);
    let outcome = parse_bytes(&bytes, "agreement.pdf").unwrap();
    let record = &outcome.record;

    assert_eq!(record.source_kind, SourceKind::FixedLayout);
    assert_eq!(record.page_size, Some((595.0, 842.0)));
    assert_eq!(record.metadata.page_count, 2);
    assert_eq!(record.blocks[0].block_type, BlockType::Title);
    assert_eq!(record.blocks.last().unwrap().page_number, 2);

    let fee = outcome
        .variables
        .iter()
        .find(|v| v.name == "Service Fee")
        .unwrap();
    assert_eq!(fee.value_type, ValueType::Currency);
    let date = outcome
        .variables
        .iter()
        .find(|v| v.name == "Sign Date")
        .unwrap();
    assert_eq!(date.value_type, ValueType::Date);
    assert!(outcome.variables.iter().any(|v| v.name == "Client Name"));
}

#[test]
fn test_parse_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("租赁合同.docx");
    std::fs::write(&path, lease_docx()).unwrap();

    let outcome = parse_file(&path).unwrap();
    assert_eq!(outcome.record.id, "租赁合同.docx");
    assert_eq!(outcome.variables.len(), 3);
}

#[test]
fn test_empty_document_is_a_warning() {
    let bytes = build_docx(&[]);

    let outcome = parse_bytes(&bytes, "empty.docx").unwrap();
    assert!(outcome.record.blocks.is_empty());
    assert!(outcome.warnings.contains(&Warning::EmptyContent));

    // Strict adapters report an error, the engine still continues
    let outcome = parse_bytes_with_options(&bytes, "empty.docx", IngestOptions::new().strict())
        .unwrap();
    assert!(outcome.record.blocks.is_empty());
    assert!(outcome.warnings.contains(&Warning::EmptyContent));
}

#[test]
fn test_hard_errors() {
    assert!(matches!(
        parse_bytes(&build_plain_zip(), "archive.zip"),
        Err(Error::UnsupportedFormat(_))
    ));
    assert!(matches!(
        parse_bytes(b"%PDF-1.4\nnot really", "broken.pdf"),
        Err(Error::CorruptInput(_))
    ));
    assert!(matches!(
        parse_bytes(b"hello", "contract.docx"),
        Err(Error::CorruptInput(_))
    ));
}

#[test]
fn test_record_survives_json() {
    let engine = TemplateEngine::new();
    let record = engine.ingest(&lease_docx(), "lease.docx").unwrap().record;

    let json = record.to_json(JsonFormat::Pretty).unwrap();
    let restored = TemplateRecord::from_json(&json).unwrap();
    assert_eq!(restored, record);
}
