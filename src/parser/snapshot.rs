//! Low-resolution page snapshots used as a layout-analysis aid.
//!
//! A snapshot is a grayscale occupancy raster: text fragments are painted as
//! mid-gray boxes, images as dark gray, ruling lines as black. Pages render in
//! parallel on a bounded pool; each page has its own wall-clock budget and a
//! failed or late page only produces a warning.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use image::{GrayImage, Luma};

use crate::error::Warning;

use super::layout::PageLayout;

const BACKGROUND: Luma<u8> = Luma([255]);
const TEXT_INK: Luma<u8> = Luma([160]);
const IMAGE_INK: Luma<u8> = Luma([96]);
const RULE_INK: Luma<u8> = Luma([0]);

/// Pixels darker than this belong to a rule.
const RULE_THRESHOLD: u8 = 64;

/// Largest snapshot edge in pixels.
const MAX_EDGE: u32 = 4096;

/// One page to render.
#[derive(Debug, Clone)]
pub struct SnapshotJob {
    /// Page number (1-indexed)
    pub page: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Shared page layout
    pub layout: Arc<PageLayout>,
}

/// Per-page outcome.
#[derive(Debug)]
enum RenderOutcome {
    Rendered(GrayImage),
    TimedOut,
    Failed(String),
}

/// Snapshots that finished in time, plus warnings for the rest.
#[derive(Debug, Default)]
pub struct SnapshotBatch {
    /// Rendered snapshots keyed by page number
    pub images: BTreeMap<u32, GrayImage>,
    /// `PageRenderTimeout` / `PageRenderFailed` warnings
    pub warnings: Vec<Warning>,
}

/// Renders page snapshots on a bounded worker pool.
#[derive(Debug, Clone)]
pub struct SnapshotRenderer {
    workers: usize,
    budget: Duration,
    scale: f32,
}

impl SnapshotRenderer {
    /// Create a renderer with the given worker count, per-page budget and scale.
    pub fn new(workers: usize, budget: Duration, scale: f32) -> Self {
        Self {
            workers: workers.max(1),
            budget,
            scale,
        }
    }

    /// Render every job. Never fails as a whole.
    pub fn render_all(&self, jobs: Vec<SnapshotJob>) -> SnapshotBatch {
        let mut batch = SnapshotBatch::default();
        if jobs.is_empty() {
            return batch;
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("snapshot-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                log::warn!("Snapshot pool unavailable: {}", e);
                for job in &jobs {
                    batch.warnings.push(Warning::PageRenderFailed {
                        page: job.page,
                        reason: format!("worker pool unavailable: {}", e),
                    });
                }
                return batch;
            }
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pending: BTreeSet<u32> = BTreeSet::new();
        let waves = jobs.len().div_ceil(self.workers) as u32;

        for job in jobs {
            pending.insert(job.page);
            let tx = tx.clone();
            let budget = self.budget;
            let scale = self.scale;
            pool.spawn(move || {
                let started = Instant::now();
                let deadline = started + budget;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    render_page(&job.layout, job.width, job.height, scale, deadline)
                }))
                .unwrap_or_else(|_| RenderOutcome::Failed("renderer panicked".to_string()));
                // The receiver may have given up already
                let _ = tx.send((job.page, outcome));
            });
        }
        drop(tx);

        // Queued pages wait for a free worker, so the batch gets one budget per wave
        let deadline = Instant::now() + self.budget * waves + Duration::from_millis(50);
        while !pending.is_empty() {
            match rx.recv_deadline(deadline) {
                Ok((page, outcome)) => {
                    pending.remove(&page);
                    match outcome {
                        RenderOutcome::Rendered(image) => {
                            batch.images.insert(page, image);
                        }
                        RenderOutcome::TimedOut => batch.warnings.push(self.timeout(page)),
                        RenderOutcome::Failed(reason) => {
                            log::warn!("Snapshot of page {} failed: {}", page, reason);
                            batch.warnings.push(Warning::PageRenderFailed { page, reason });
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for page in pending {
            batch.warnings.push(self.timeout(page));
        }

        log::debug!(
            "Rendered {} snapshots with {} warnings",
            batch.images.len(),
            batch.warnings.len()
        );
        batch
    }

    fn timeout(&self, page: u32) -> Warning {
        log::warn!(
            "Snapshot of page {} exceeded {} ms",
            page,
            self.budget.as_millis()
        );
        Warning::PageRenderTimeout {
            page,
            budget_ms: self.budget.as_millis() as u64,
        }
    }
}

/// Paint one page. Checks the deadline between elements.
fn render_page(
    layout: &PageLayout,
    width: f32,
    height: f32,
    scale: f32,
    deadline: Instant,
) -> RenderOutcome {
    if !(width > 0.0 && height > 0.0 && scale > 0.0) {
        return RenderOutcome::Failed(format!("invalid page size {}x{}", width, height));
    }

    let px_w = ((width * scale).ceil() as u32).clamp(1, MAX_EDGE);
    let px_h = ((height * scale).ceil() as u32).clamp(1, MAX_EDGE);
    let mut canvas = Canvas {
        image: GrayImage::from_pixel(px_w, px_h, BACKGROUND),
        page_height: height,
        scale,
    };

    for (i, image) in layout.images.iter().enumerate() {
        if i % 16 == 0 && Instant::now() > deadline {
            return RenderOutcome::TimedOut;
        }
        canvas.fill(image.x, image.y, image.x + image.width, image.y + image.height, IMAGE_INK);
    }
    for (i, fragment) in layout.fragments.iter().enumerate() {
        if i % 64 == 0 && Instant::now() > deadline {
            return RenderOutcome::TimedOut;
        }
        canvas.fill(
            fragment.x,
            fragment.bottom(),
            fragment.right(),
            fragment.top(),
            TEXT_INK,
        );
    }
    for (i, rule) in layout.rules.iter().enumerate() {
        if i % 64 == 0 && Instant::now() > deadline {
            return RenderOutcome::TimedOut;
        }
        canvas.line(rule.x0, rule.y0, rule.x1, rule.y1);
    }

    if Instant::now() > deadline {
        return RenderOutcome::TimedOut;
    }
    RenderOutcome::Rendered(canvas.image)
}

/// Maps page points (origin bottom-left) onto pixels (origin top-left).
struct Canvas {
    image: GrayImage,
    page_height: f32,
    scale: f32,
}

impl Canvas {
    fn to_px(&self, x: f32, y: f32) -> (i64, i64) {
        (
            (x * self.scale).floor() as i64,
            ((self.page_height - y) * self.scale).floor() as i64,
        )
    }

    fn put(&mut self, x: i64, y: i64, ink: Luma<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            let pixel = self.image.get_pixel_mut(x as u32, y as u32);
            // Darker ink wins
            if ink.0[0] < pixel.0[0] {
                *pixel = ink;
            }
        }
    }

    fn fill(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, ink: Luma<u8>) {
        let (ax, ay) = self.to_px(x0.min(x1), y0.max(y1));
        let (bx, by) = self.to_px(x0.max(x1), y0.min(y1));
        let max_x = (self.image.width() as i64 - 1).min(bx);
        let max_y = (self.image.height() as i64 - 1).min(by);
        for py in ay.max(0)..=max_y {
            for px in ax.max(0)..=max_x {
                self.put(px, py, ink);
            }
        }
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let (ax, ay) = self.to_px(x0, y0);
        let (bx, by) = self.to_px(x1, y1);
        let steps = (bx - ax).abs().max((by - ay).abs()).max(1);
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = ax as f32 + (bx - ax) as f32 * t;
            let y = ay as f32 + (by - ay) as f32 * t;
            self.put(x.round() as i64, y.round() as i64, RULE_INK);
        }
    }
}

/// Count horizontal rules: groups of adjacent pixel rows whose longest dark run
/// is at least `min_run` pixels.
pub fn horizontal_rule_rows(image: &GrayImage, min_run: u32) -> usize {
    let mut groups = 0;
    let mut previous_was_rule = false;

    for y in 0..image.height() {
        let mut longest = 0;
        let mut run = 0;
        for x in 0..image.width() {
            if image.get_pixel(x, y).0[0] < RULE_THRESHOLD {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }

        let is_rule = longest >= min_run;
        if is_rule && !previous_was_rule {
            groups += 1;
        }
        previous_was_rule = is_rule;
    }

    groups
}
