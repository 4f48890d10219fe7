//! End-to-end tests: ingest, substitute, emit.

mod common;

use std::collections::BTreeSet;

use common::{build_docx, document_xml, init_logger, Para};
use pretty_assertions::assert_eq;
use retemplate::render::emit;
use retemplate::variable::{extract, infer_type, substitute};
use retemplate::{
    fill_text, Alignment, BlockType, ContentBlock, GenerationOptions, GenerationPath, OutputFormat,
    SourceKind, TemplateEngine, TemplateRecord, ValueMap, ValueType, VariableValue, Warning,
};

fn scenario_values() -> ValueMap {
    let mut values = ValueMap::new();
    values.insert("甲方名称".to_string(), VariableValue::new("广州A公司"));
    values.insert("乙方名称".to_string(), VariableValue::new("B公司"));
    values.insert(
        "合同金额".to_string(),
        VariableValue::typed("280000", ValueType::Currency),
    );
    values
}

fn text_options() -> GenerationOptions {
    GenerationOptions::new().with_output_format(OutputFormat::Text)
}

#[test]
fn test_scenario_text() {
    let text = "甲方：[甲方名称]\n乙方：[乙方名称]\n金额：{{合同金额}}";
    assert_eq!(
        fill_text(text, &scenario_values()),
        "甲方：广州A公司\n乙方：B公司\n金额：280,000.00"
    );
}

#[test]
fn test_scenario_through_docx_upload() {
    let bytes = build_docx(&[
        Para::Text(None, "甲方：[甲方名称]"),
        Para::Text(None, "乙方：[乙方名称]"),
        Para::Text(None, "金额：{{合同金额}}"),
    ]);
    let engine = TemplateEngine::new();
    let outcome = engine.ingest(&bytes, "scenario.docx").unwrap();
    assert_eq!(outcome.record.blocks.len(), 3);

    let result = engine.generate(Some(&outcome.record), &scenario_values(), &text_options());
    assert!(result.success);
    assert_eq!(result.path, GenerationPath::Structured);
    assert_eq!(
        String::from_utf8(result.binary).unwrap(),
        "甲方：广州A公司\n乙方：B公司\n金额：280,000.00"
    );
    assert_eq!(result.metadata.variables_substituted, 3);
}

#[test]
fn test_generated_docx_contains_values() {
    let bytes = build_docx(&[
        Para::Text(Some("Title"), "采购合同"),
        Para::Text(None, "采购方（甲方）：[甲方名称]"),
        Para::Text(None, "合同总金额为人民币{{合同金额}}元。"),
    ]);
    let engine = TemplateEngine::new();
    let record = engine.ingest(&bytes, "purchase.docx").unwrap().record;

    let result = engine.generate(Some(&record), &scenario_values(), &GenerationOptions::default());
    assert!(result.success);
    assert_eq!(
        result.mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );

    let reparsed = engine.ingest(&result.binary, "out.docx").unwrap();
    assert!(reparsed.document.raw_text.contains("广州A公司"));
    assert!(reparsed.document.raw_text.contains("280,000.00"));
    assert!(reparsed.variables.is_empty());
    assert_eq!(reparsed.record.blocks[0].block_type, BlockType::Title);
}

#[test]
fn test_source_alignment_survives_regeneration() {
    let bytes = build_docx(&[
        Para::Text(Some("Title"), "保密协议"),
        Para::Aligned("center", true, "特别提示"),
        Para::Text(None, "双方应对[保密信息]承担保密义务。"),
        Para::Aligned("right", false, "甲方（盖章）：[甲方名称]"),
    ]);
    let engine = TemplateEngine::new();
    let record = engine.ingest(&bytes, "nda.docx").unwrap().record;

    let notice = record.blocks.iter().find(|b| b.text == "特别提示").unwrap();
    assert!(notice.style.bold);
    assert_eq!(notice.style.alignment, Alignment::Center);
    let signature = record.blocks.last().unwrap();
    assert_eq!(signature.style.alignment, Alignment::Right);

    let result = engine.generate(Some(&record), &scenario_values(), &GenerationOptions::default());
    assert!(result.success);
    let xml = document_xml(&result.binary);
    assert!(xml.contains(r#"w:jc w:val="right""#));
    assert!(xml.contains("甲方（盖章）：广州A公司"));
}

#[test]
fn test_malformed_table_row_degrades() {
    let mut record = TemplateRecord::new("t", SourceKind::Flowed);
    record.blocks = vec![
        ContentBlock::paragraph("第一段正文。"),
        ContentBlock::new(BlockType::TableRow, "+--------+--------+", 1),
        ContentBlock::paragraph("第二段正文。"),
    ];

    let result =
        TemplateEngine::new().generate(Some(&record), &ValueMap::new(), &GenerationOptions::default());
    assert!(result.success);
    assert!(!result.binary.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::EmissionPartialFailure { block_index: 1, .. })));
}

#[test]
fn test_substitution_is_idempotent() {
    let blocks = vec![
        ContentBlock::new(BlockType::Title, "[项目名称]服务合同", 1),
        ContentBlock::paragraph("甲方：[甲方名称]，金额：{{合同金额}}，日期：${签订日期}"),
    ];
    let mut values = scenario_values();
    values.insert("签订日期".to_string(), VariableValue::new("2024/3/8"));

    let once = substitute(&blocks, &values);
    let twice = substitute(&once, &values);
    assert_eq!(once, twice);
    assert_eq!(
        once[1].text,
        "甲方：广州A公司，金额：280,000.00，日期：2024年03月08日"
    );
    // No value supplied, the placeholder stays
    assert_eq!(once[0].text, "[项目名称]服务合同");
}

#[test]
fn test_extraction_completeness() {
    let text = "甲方[甲方名称]与乙方【乙方名称】于${签订日期}签订，\
                金额{{合同金额}}，违约金按［违约金比例］计算，甲方[甲方名称]盖章。";
    let placeholders = extract(text);
    let names: BTreeSet<&str> = placeholders
        .iter()
        .map(|p| p.logical_name.as_str())
        .collect();

    assert_eq!(names.len(), 5);
    for name in ["甲方名称", "乙方名称", "签订日期", "合同金额", "违约金比例"] {
        assert!(names.contains(name), "missing {}", name);
    }
}

#[test]
fn test_type_inference() {
    assert_eq!(infer_type("合同金额"), ValueType::Currency);
    assert_eq!(infer_type("amount"), ValueType::Currency);
    assert_eq!(infer_type("签订日期"), ValueType::Date);
    assert_eq!(infer_type("违约金比例"), ValueType::Percentage);
    assert_eq!(infer_type("甲方名称"), ValueType::Text);
}

#[test]
fn test_formatting() {
    let mut values = ValueMap::new();
    values.insert(
        "amount".to_string(),
        VariableValue::typed("280000", ValueType::Currency),
    );
    values.insert(
        "date".to_string(),
        VariableValue::typed("sometime soon", ValueType::Date),
    );
    assert!(fill_text("{{amount}}", &values).contains("280,000.00"));
    assert_eq!(fill_text("[date]", &values), "sometime soon");
}

#[test]
fn test_docx_round_trip_keeps_block_count() {
    let blocks = vec![
        ContentBlock::new(BlockType::Title, "采购合同", 1),
        ContentBlock::new(BlockType::SectionHeader, "第一章 总则", 1),
        ContentBlock::new(BlockType::Clause, "第一条 乙方向甲方提供货物，数量为十台。", 1),
        ContentBlock::new(BlockType::TableRow, "名称 | 数量", 1),
        ContentBlock::new(BlockType::TableRow, "空调 | 10", 1),
        ContentBlock::new(BlockType::Paragraph, "本合同一式两份。", 2),
    ];
    let emission = emit(&blocks, &GenerationOptions::default()).unwrap();
    assert!(!emission.bytes.is_empty());
    assert_eq!(emission.page_count, 2);

    let outcome = TemplateEngine::new()
        .ingest(&emission.bytes, "round-trip.docx")
        .unwrap();
    let reparsed = &outcome.record.blocks;
    let diff = (reparsed.len() as i64 - blocks.len() as i64).abs();
    assert!(diff <= 1, "{} blocks became {}", blocks.len(), reparsed.len());
    assert_eq!(reparsed[0].block_type, BlockType::Title);
    assert_eq!(reparsed.last().unwrap().page_number, 2);
}

#[test]
fn test_upload_failure_uses_reported_fallback() {
    init_logger();
    let mut values = ValueMap::new();
    values.insert("月租金".to_string(), VariableValue::new("3500"));

    let result = TemplateEngine::new().generate_from_upload(
        b"not a document",
        "房屋租赁合同.docx",
        &values,
        &text_options(),
    );
    assert!(result.success);
    assert_eq!(result.path, GenerationPath::Fallback);
    assert!(result.error.is_some());
    assert!(matches!(result.warnings[0], Warning::IngestionFallback { .. }));

    let text = String::from_utf8(result.binary).unwrap();
    assert!(text.starts_with("房屋租赁合同"));
    assert!(text.contains("3,500.00"));
    // Values not supplied are still reported
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::MissingRequiredValue { name, .. } if name == "甲方名称")));
}

#[test]
fn test_engine_is_shared_across_threads() {
    let engine = TemplateEngine::new();
    let bytes = build_docx(&[Para::Text(None, "甲方：[甲方名称]")]);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = &engine;
                let bytes = &bytes;
                scope.spawn(move || {
                    let mut values = ValueMap::new();
                    values.insert("甲方名称".to_string(), VariableValue::new(format!("公司{}", i)));
                    let record = engine.ingest(bytes, "t.docx").unwrap().record;
                    let result = engine.generate(Some(&record), &values, &text_options());
                    String::from_utf8(result.binary).unwrap()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("甲方：公司{}", i));
        }
    });
}
