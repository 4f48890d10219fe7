//! Ingestion options and configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Options for ingesting template documents.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Which pages of a fixed-layout document to ingest
    pub pages: PageSelection,

    /// Whether to render page snapshots for layout analysis
    pub render_snapshots: bool,

    /// Maximum number of pages rendered concurrently
    pub snapshot_workers: usize,

    /// Wall-clock budget for rendering one page
    pub page_render_budget: Duration,

    /// Snapshot resolution in pixels per point
    pub snapshot_scale: f32,
}

impl IngestOptions {
    /// Create new ingest options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable strict mode (unreadable pages and empty documents are errors).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable page snapshots.
    pub fn with_snapshots(mut self, render: bool) -> Self {
        self.render_snapshots = render;
        self
    }

    /// Set the number of snapshot workers (at least one).
    pub fn with_snapshot_workers(mut self, workers: usize) -> Self {
        self.snapshot_workers = workers.max(1);
        self
    }

    /// Set the per-page render budget.
    pub fn with_page_budget(mut self, budget: Duration) -> Self {
        self.page_render_budget = budget;
        self
    }

    /// Set the snapshot scale (clamped to 0.05..=4.0 pixels per point).
    pub fn with_snapshot_scale(mut self, scale: f32) -> Self {
        self.snapshot_scale = scale.clamp(0.05, 4.0);
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(4);

        Self {
            error_mode: ErrorMode::Lenient,
            pages: PageSelection::All,
            render_snapshots: true,
            snapshot_workers: workers,
            page_render_budget: Duration::from_secs(2),
            snapshot_scale: 0.5,
        }
    }
}

/// Error handling mode during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on unreadable pages and empty documents
    Strict,
    /// Skip unreadable content and record a warning
    #[default]
    Lenient,
}

/// Page selection for fixed-layout ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_options_builder() {
        let options = IngestOptions::new()
            .strict()
            .with_snapshots(false)
            .with_snapshot_workers(0)
            .with_page_budget(Duration::from_millis(250));

        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(!options.render_snapshots);
        assert_eq!(options.snapshot_workers, 1);
        assert_eq!(options.page_render_budget, Duration::from_millis(250));
    }

    #[test]
    fn test_default_options() {
        let options = IngestOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(options.render_snapshots);
        assert!((1..=4).contains(&options.snapshot_workers));
    }

    #[test]
    fn test_page_selection_includes() {
        assert!(PageSelection::All.includes(100));

        let range = PageSelection::Range(2..=3);
        assert!(!range.includes(1));
        assert!(range.includes(3));

        let pages = PageSelection::Pages(vec![1, 4]);
        assert!(pages.includes(4));
        assert!(!pages.includes(2));
    }
}
