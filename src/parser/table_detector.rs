//! Multi-pattern table detection for fixed-layout pages.
//!
//! Tables in contract PDFs show up in several ways: box-drawing glyphs in the
//! text, wide column gaps repeated over consecutive lines, ruling lines in the
//! content stream or the page snapshot, and fragment columns whose left edges
//! line up across baselines. Any single pattern is enough to flag the page.

use std::collections::{HashMap, HashSet};

use image::GrayImage;

use super::layout::{PageLayout, TextLine};
use super::snapshot::horizontal_rule_rows;

/// Glyphs that only appear in drawn tables.
const BOX_GLYPHS: &[char] = &[
    '│', '┃', '｜', '─', '━', '═', '║', '┌', '┐', '└', '┘', '├', '┤', '┬', '┴', '┼', '╔', '╗',
    '╚', '╝', '╠', '╣', '╦', '╩', '╬',
];

/// Which evidence marked a page as containing a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TablePattern {
    /// Box-drawing or bar glyphs in the text
    BoxGlyphs,
    /// Consecutive lines with two or more column gaps
    ColumnGaps,
    /// Horizontal ruling lines drawn in the content stream
    RulingLines,
    /// Horizontal rules found in the page snapshot
    SnapshotRules,
    /// Fragment left edges aligned across baselines
    AlignedColumns,
}

/// Result of running every detection pattern on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableEvidence {
    /// Patterns that fired, in detection order
    pub patterns: Vec<TablePattern>,
}

impl TableEvidence {
    /// Whether any pattern fired.
    pub fn is_table(&self) -> bool {
        !self.patterns.is_empty()
    }

    pub fn has(&self, pattern: TablePattern) -> bool {
        self.patterns.contains(&pattern)
    }
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Bucket width when matching column edges (points)
    pub edge_bucket: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between column edges (points)
    pub min_column_gap: f32,
    /// Minimum length of a ruling line (points)
    pub min_rule_length: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            edge_bucket: 5.0,
            min_alignment_ratio: 0.6,
            min_column_gap: 15.0,
            min_rule_length: 72.0,
        }
    }
}

/// Runs the detection patterns over a page.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Run every pattern. `snapshot` is optional because rendering may time out.
    pub fn detect(
        &self,
        lines: &[TextLine],
        layout: &PageLayout,
        snapshot: Option<&GrayImage>,
    ) -> TableEvidence {
        let mut evidence = TableEvidence::default();

        if lines.iter().any(|l| l.text().contains(BOX_GLYPHS)) {
            evidence.patterns.push(TablePattern::BoxGlyphs);
        }
        if self.has_column_gap_run(lines) {
            evidence.patterns.push(TablePattern::ColumnGaps);
        }
        if layout.horizontal_rules(self.config.min_rule_length).count() >= self.config.min_rows {
            evidence.patterns.push(TablePattern::RulingLines);
        }
        if let Some(image) = snapshot {
            let min_run = (image.width() as f32 * 0.25) as u32;
            if horizontal_rule_rows(image, min_run.max(4)) >= self.config.min_rows {
                evidence.patterns.push(TablePattern::SnapshotRules);
            }
        }
        if self.has_aligned_columns(lines) {
            evidence.patterns.push(TablePattern::AlignedColumns);
        }

        if evidence.is_table() {
            log::debug!("TableDetector: patterns {:?}", evidence.patterns);
        }
        evidence
    }

    /// `min_rows` consecutive lines that each split into 3+ columns.
    fn has_column_gap_run(&self, lines: &[TextLine]) -> bool {
        let mut run = 0;
        for line in lines {
            if line.column_starts().len() >= 3 {
                run += 1;
                if run >= self.config.min_rows {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }

    /// Column edges shared by consecutive multi-column lines.
    fn has_aligned_columns(&self, lines: &[TextLine]) -> bool {
        let rows: Vec<Vec<f32>> = lines
            .iter()
            .map(|l| l.column_starts())
            .filter(|starts| starts.len() >= self.config.min_columns)
            .collect();
        if rows.len() < self.config.min_rows {
            return false;
        }

        let columns = self.detect_columns(&rows);
        if columns.len() < self.config.min_columns || columns.len() > self.config.max_columns {
            return false;
        }

        let mut consecutive = 0;
        for starts in &rows {
            if self.alignment_score(starts, &columns) >= self.config.min_alignment_ratio
                && !self.is_list_row(starts, &columns)
            {
                consecutive += 1;
                if consecutive >= self.config.min_rows {
                    return true;
                }
            } else {
                consecutive = 0;
            }
        }
        false
    }

    /// Left edges that recur in enough rows, merged when closer than `min_column_gap`.
    fn detect_columns(&self, rows: &[Vec<f32>]) -> Vec<f32> {
        let bucket_size = self.config.edge_bucket;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();

        for starts in rows {
            // Count each bucket once per row
            let buckets: HashSet<i32> = starts
                .iter()
                .map(|x| (x / bucket_size).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    fn alignment_score(&self, starts: &[f32], columns: &[f32]) -> f32 {
        if starts.is_empty() {
            return 0.0;
        }
        let tolerance = self.config.edge_bucket;
        let aligned = starts
            .iter()
            .filter(|x| columns.iter().any(|c| (*x - c).abs() <= tolerance))
            .count();
        aligned as f32 / starts.len() as f32
    }

    /// A two-column row whose first column is a narrow marker gutter is a list item.
    fn is_list_row(&self, starts: &[f32], columns: &[f32]) -> bool {
        columns.len() == 2 && starts.len() == 2 && columns[1] - columns[0] < 30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextFragment;
    use crate::parser::layout::{group_into_lines, RuleLine};
    use image::Luma;

    fn row(cells: &[(&str, f32)], y: f32) -> Vec<TextFragment> {
        cells
            .iter()
            .map(|(text, x)| TextFragment::new(*text, *x, y, 10.0, "SimSun"))
            .collect()
    }

    #[test]
    fn test_plain_prose_is_not_a_table() {
        let mut fragments = row(&[("本合同自双方签字之日起生效。", 72.0)], 700.0);
        fragments.extend(row(&[("本合同一式两份。", 72.0)], 680.0));
        let lines = group_into_lines(fragments);

        let evidence = TableDetector::new().detect(&lines, &PageLayout::default(), None);
        assert!(!evidence.is_table());
    }

    #[test]
    fn test_column_gap_rows_are_a_table() {
        let mut fragments = row(&[("名称", 72.0), ("数量", 200.0), ("单价", 320.0)], 700.0);
        fragments.extend(row(&[("钢材", 72.0), ("10", 200.0), ("500", 320.0)], 680.0));
        let lines = group_into_lines(fragments);

        let evidence = TableDetector::new().detect(&lines, &PageLayout::default(), None);
        assert!(evidence.has(TablePattern::ColumnGaps));
        assert!(evidence.has(TablePattern::AlignedColumns));
    }

    #[test]
    fn test_box_glyphs() {
        let lines = group_into_lines(row(&[("│ 名称 │ 数量 │", 72.0)], 700.0));
        let evidence = TableDetector::new().detect(&lines, &PageLayout::default(), None);
        assert!(evidence.has(TablePattern::BoxGlyphs));
    }

    #[test]
    fn test_ruling_lines() {
        let layout = PageLayout {
            rules: vec![
                RuleLine::new(72.0, 700.0, 520.0, 700.0),
                RuleLine::new(72.0, 680.0, 520.0, 680.0),
                // too short to count
                RuleLine::new(72.0, 660.0, 80.0, 660.0),
            ],
            ..Default::default()
        };
        let evidence = TableDetector::new().detect(&[], &layout, None);
        assert_eq!(evidence.patterns, vec![TablePattern::RulingLines]);
    }

    #[test]
    fn test_snapshot_rules() {
        let mut image = GrayImage::from_pixel(100, 60, Luma([255]));
        for y in [10u32, 30] {
            for x in 5..95 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        let evidence = TableDetector::new().detect(&[], &PageLayout::default(), Some(&image));
        assert!(evidence.has(TablePattern::SnapshotRules));
    }

    #[test]
    fn test_numbered_list_is_not_aligned_columns() {
        let mut fragments = row(&[("1.", 72.0), ("付款方式", 90.0)], 700.0);
        fragments.extend(row(&[("2.", 72.0), ("交货期限", 90.0)], 680.0));
        let lines = group_into_lines(fragments);
        let evidence = TableDetector::new().detect(&lines, &PageLayout::default(), None);
        assert!(!evidence.has(TablePattern::AlignedColumns));
    }
}
