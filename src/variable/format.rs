//! Type-aware value formatting.
//!
//! Every formatter returns `None` when the raw value does not parse; callers
//! then insert the raw string unchanged.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ValueType;

static PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());

/// Date layouts accepted on input, tried in order.
const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Formatting options for substituted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstitutionOptions {
    /// chrono format string for dates
    pub date_format: String,

    /// Fractional digits for currency
    pub currency_decimals: usize,

    /// Thousands separator for currency
    pub thousands_separator: String,
}

impl Default for SubstitutionOptions {
    fn default() -> Self {
        Self {
            date_format: "%Y年%m月%d日".to_string(),
            currency_decimals: 2,
            thousands_separator: ",".to_string(),
        }
    }
}

impl SubstitutionOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date output format.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Set the number of currency decimals.
    pub fn with_currency_decimals(mut self, decimals: usize) -> Self {
        self.currency_decimals = decimals;
        self
    }

    /// Set the thousands separator.
    pub fn with_thousands_separator(mut self, separator: impl Into<String>) -> Self {
        self.thousands_separator = separator.into();
        self
    }
}

/// Format `raw` as `value_type`, falling back to the raw string.
pub fn format_value(raw: &str, value_type: ValueType, options: &SubstitutionOptions) -> String {
    let formatted = match value_type {
        ValueType::Text => None,
        ValueType::Currency => format_currency(raw, options),
        ValueType::Date => format_date(raw, options),
        ValueType::Percentage => format_percentage(raw),
    };
    formatted.unwrap_or_else(|| raw.to_string())
}

/// `"¥280000元"` to `"280,000.00"`.
pub fn format_currency(raw: &str, options: &SubstitutionOptions) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['¥', '￥', '$', '€'])
        .trim_end_matches('元')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '，')
        .collect();
    if !PLAIN_NUMBER.is_match(&cleaned) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let fixed = format!("{:.*}", options.currency_decimals, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(integer, &options.thousands_separator));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    Some(out)
}

/// Parse a calendar date and render it with `options.date_format`.
pub fn format_date(raw: &str, options: &SubstitutionOptions) -> Option<String> {
    let date = parse_date(raw.trim())?;
    let mut out = String::new();
    // An invalid caller format string surfaces as a fmt error
    write!(out, "{}", date.format(&options.date_format)).ok()?;
    Some(out)
}

/// `"5"` or `"5 %"` to `"5%"`.
pub fn format_percentage(raw: &str) -> Option<String> {
    let number = raw.trim().trim_end_matches(['%', '％']).trim();
    if !PLAIN_NUMBER.is_match(number) {
        return None;
    }
    Some(format!("{}%", number))
}

/// Parse the accepted date layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw[..4].parse().ok()?;
        let month = raw[4..6].parse().ok()?;
        let day = raw[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    DATE_INPUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(raw, layout).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SubstitutionOptions {
        SubstitutionOptions::default()
    }

    #[test]
    fn test_currency() {
        assert_eq!(format_currency("280000", &opts()).as_deref(), Some("280,000.00"));
        assert_eq!(format_currency("¥1,234.5元", &opts()).as_deref(), Some("1,234.50"));
        assert_eq!(format_currency("-1500", &opts()).as_deref(), Some("-1,500.00"));
        assert_eq!(format_currency("999", &opts()).as_deref(), Some("999.00"));
        assert_eq!(format_currency("1234.567", &opts()).as_deref(), Some("1,234.57"));
        assert_eq!(format_currency("二十万", &opts()), None);
        assert_eq!(format_currency("1e5", &opts()), None);
    }

    #[test]
    fn test_currency_options() {
        let options = SubstitutionOptions::new()
            .with_currency_decimals(0)
            .with_thousands_separator(" ");
        assert_eq!(format_currency("1234567", &options).as_deref(), Some("1 234 567"));
    }

    #[test]
    fn test_dates() {
        for raw in ["2024-03-15", "2024/3/15", "2024.03.15", "20240315", "2024年3月15日"] {
            assert_eq!(
                format_date(raw, &opts()).as_deref(),
                Some("2024年03月15日"),
                "input {}",
                raw
            );
        }
        assert_eq!(
            format_date("2024-03-15T10:00:00+08:00", &opts()).as_deref(),
            Some("2024年03月15日")
        );
        assert_eq!(format_date("下个月", &opts()), None);
        assert_eq!(format_date("2024-02-30", &opts()), None);
    }

    #[test]
    fn test_custom_date_format() {
        let options = SubstitutionOptions::new().with_date_format("%d/%m/%Y");
        assert_eq!(format_date("2024-03-15", &options).as_deref(), Some("15/03/2024"));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(format_percentage("5").as_deref(), Some("5%"));
        assert_eq!(format_percentage("5.5 %").as_deref(), Some("5.5%"));
        assert_eq!(format_percentage("百分之五"), None);
    }

    #[test]
    fn test_format_value_falls_back_to_raw() {
        assert_eq!(format_value("明天", ValueType::Date, &opts()), "明天");
        assert_eq!(format_value("abc", ValueType::Currency, &opts()), "abc");
        assert_eq!(format_value(" 原样 ", ValueType::Text, &opts()), " 原样 ");
    }
}
