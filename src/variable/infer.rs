//! Name-based value type inference.

use crate::model::ValueType;

const PERCENTAGE_KEYWORDS: &[&str] = &["比例", "比率", "百分比", "利率", "税率", "费率", "占比"];
const PERCENTAGE_WORDS: &[&str] = &["rate", "ratio", "percent", "percentage", "pct"];

const DATE_KEYWORDS: &[&str] = &[
    "日期", "时间", "期限起", "签订日", "签署日", "生效日", "到期日", "起租日", "年月日",
];
const DATE_WORDS: &[&str] = &["date", "time", "day", "deadline", "dob"];

const CURRENCY_KEYWORDS: &[&str] = &[
    "金额", "价款", "价格", "费用", "租金", "报酬", "工资", "薪资", "薪酬", "押金", "保证金",
    "总价", "单价", "款",
];
const CURRENCY_WORDS: &[&str] = &[
    "amount", "price", "fee", "fees", "cost", "payment", "salary", "rent", "total", "deposit",
];

/// CJK words whose "款" is not money.
const NOT_MONEY: &[&str] = &["条款", "款项说明", "款式"];

/// Infer a value type from a placeholder name.
///
/// Percentage is checked first so "费率" is not read as a fee, then date,
/// then currency. Unrecognized names are text.
pub fn infer_type(name: &str) -> ValueType {
    let words = latin_words(name);
    let has = |cjk: &[&str], latin: &[&str]| {
        cjk.iter().any(|k| name.contains(k)) || words.iter().any(|w| latin.contains(&w.as_str()))
    };

    if has(PERCENTAGE_KEYWORDS, PERCENTAGE_WORDS) {
        ValueType::Percentage
    } else if has(DATE_KEYWORDS, DATE_WORDS) {
        ValueType::Date
    } else if is_currency(name, &words) {
        ValueType::Currency
    } else {
        ValueType::Text
    }
}

fn is_currency(name: &str, words: &[String]) -> bool {
    if words.iter().any(|w| CURRENCY_WORDS.contains(&w.as_str())) {
        return true;
    }
    let mut stripped = name.to_string();
    for phrase in NOT_MONEY {
        stripped = stripped.replace(phrase, "");
    }
    CURRENCY_KEYWORDS.iter().any(|k| stripped.contains(k))
}

/// Lowercase ASCII words, splitting on separators and camelCase humps.
fn latin_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_ascii_lowercase();
            current.push(c.to_ascii_lowercase());
        } else {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
