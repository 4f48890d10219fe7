//! Table reconstruction from table-row blocks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Table, TableRow};

/// Bar glyphs, strongest delimiter.
const BARS: &[char] = &['|', '｜', '│', '┃'];

/// Glyphs that only draw rules and borders.
const RULE_GLYPHS: &[char] = &[
    '-', '—', '–', '_', '=', '+', '─', '━', '═', '┌', '┐', '└', '┘', '├', '┤', '┬', '┴', '┼',
    '╔', '╗', '╚', '╝', '╠', '╣', '╦', '╩', '╬', '|', '｜', '│', '┃', '║', ':', ' ',
];

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \u{3000}\u{00A0}]{2,}").unwrap());

/// Split a row's text into cells on the strongest delimiter present.
///
/// Bars beat tabs, tabs beat runs of two or more spaces, and single
/// whitespace is the last resort. Returns `None` for malformed rows: empty
/// text or pure rule lines.
pub fn split_row(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if text.is_empty() || text.chars().all(|c| RULE_GLYPHS.contains(&c)) {
        return None;
    }

    let cells: Vec<String> = if text.contains(BARS) {
        let mut cells: Vec<String> = text.split(BARS).map(|c| c.trim().to_string()).collect();
        // "| a | b |" has empty edge cells
        if cells.first().is_some_and(|c| c.is_empty()) {
            cells.remove(0);
        }
        if cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        cells
    } else if text.contains('\t') {
        text.split('\t').map(|c| c.trim().to_string()).collect()
    } else if MULTI_SPACE.is_match(text) {
        MULTI_SPACE.split(text).map(|c| c.trim().to_string()).collect()
    } else {
        text.split_whitespace().map(str::to_string).collect()
    };

    if cells.iter().all(|c| c.is_empty()) {
        return None;
    }
    Some(cells)
}

/// Build a table from pre-split rows, padding short rows.
pub fn build_table(rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    for cells in rows {
        table.add_row(TableRow::from_strings(cells));
    }
    table.normalize();
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(text: &str) -> Vec<String> {
        split_row(text).unwrap()
    }

    #[test]
    fn test_bar_delimiter_wins() {
        assert_eq!(cells("| 名称 | 数量  单价 |"), vec!["名称", "数量  单价"]);
        assert_eq!(cells("名称｜数量"), vec!["名称", "数量"]);
        assert_eq!(cells("│ a │  │ c │"), vec!["a", "", "c"]);
    }

    #[test]
    fn test_tab_then_spaces_then_whitespace() {
        assert_eq!(cells("名称\t数量 单位"), vec!["名称", "数量 单位"]);
        assert_eq!(cells("空调  2 台  3000"), vec!["空调", "2 台", "3000"]);
        assert_eq!(cells("姓名：张三 性别：男"), vec!["姓名：张三", "性别：男"]);
    }

    #[test]
    fn test_malformed_rows() {
        assert!(split_row("").is_none());
        assert!(split_row("   ").is_none());
        assert!(split_row("+-----+-----+").is_none());
        assert!(split_row("│││").is_none());
        assert!(split_row("| | |").is_none());
    }

    #[test]
    fn test_build_table_pads_rows() {
        let table = build_table(vec![cells("a  b  c"), cells("合计  100")]);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows[1].cells.len(), 3);
        assert_eq!(table.plain_text(), "a | b | c\n合计 | 100 | ");
    }
}
