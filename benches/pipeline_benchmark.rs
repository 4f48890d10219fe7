//! Benchmarks for the template pipeline.
//!
//! Run with: cargo bench
//!
//! These benchmarks use a synthetic contract with a configurable number of articles.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use retemplate::render::emit;
use retemplate::variable::substitute;
use retemplate::{
    GenerationOptions, LayoutClassifier, OutputFormat, ValueMap, ValueType, VariableValue,
};

/// Creates a contract text with the given number of articles.
fn create_contract(articles: usize) -> String {
    let mut text = String::from("技术服务合同\n甲方：[甲方名称]\n乙方：[乙方名称]\n");
    for i in 0..articles {
        text.push_str(&format!(
            "第{}条 乙方应按约定提供服务，服务费用为{{{{合同金额}}}}元，于${{签订日期}}前支付。\n",
            i + 1
        ));
        if i % 10 == 0 {
            text.push_str("项目 | 数量 | 单价\n");
            text.push_str("[项目名称] | 1 | [单价]\n");
        }
    }
    text.push_str("签订日期：${签订日期}\n");
    text
}

fn values() -> ValueMap {
    let mut values = ValueMap::new();
    values.insert("甲方名称".to_string(), VariableValue::new("广州A公司"));
    values.insert("乙方名称".to_string(), VariableValue::new("B公司"));
    values.insert(
        "合同金额".to_string(),
        VariableValue::typed("280000", ValueType::Currency),
    );
    values.insert("签订日期".to_string(), VariableValue::new("2024-03-08"));
    values
}

/// Benchmark line classification at various sizes.
fn bench_classification(c: &mut Criterion) {
    let classifier = LayoutClassifier::default();
    let mut group = c.benchmark_group("classify_text");

    for articles in [10, 100, 500].iter() {
        let text = create_contract(*articles);

        group.bench_function(format!("{}_articles", articles), |b| {
            b.iter(|| classifier.classify_text(black_box(&text)));
        });
    }

    group.finish();
}

/// Benchmark substitution over classified blocks.
fn bench_substitution(c: &mut Criterion) {
    let blocks = LayoutClassifier::default()
        .classify_text(&create_contract(100))
        .blocks;
    let values = values();

    c.bench_function("substitute_100_articles", |b| {
        b.iter(|| substitute(black_box(&blocks), black_box(&values)));
    });
}

/// Benchmark document emission.
fn bench_emission(c: &mut Criterion) {
    let blocks = substitute(
        &LayoutClassifier::default()
            .classify_text(&create_contract(100))
            .blocks,
        &values(),
    );
    let docx = GenerationOptions::default();
    let text = GenerationOptions::new().with_output_format(OutputFormat::Text);

    c.bench_function("emit_docx", |b| {
        b.iter(|| emit(black_box(&blocks), &docx).unwrap());
    });

    c.bench_function("emit_text", |b| {
        b.iter(|| emit(black_box(&blocks), &text).unwrap());
    });
}

criterion_group!(
    benches,
    bench_classification,
    bench_substitution,
    bench_emission,
);
criterion_main!(benches);
