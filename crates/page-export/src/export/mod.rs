//! Document assembly driver
//!
//! This module sequences one export run:
//! 1. Prepare external capabilities and wait for embedded images
//! 2. Hide screen-only chrome and normalize the document background
//! 3. Enumerate capture units
//! 4. Capture each unit in order, blank-filtering and slicing overflow
//! 5. Restore every tracked mutation, then save the output document
//!
//! Restoration is two-layered: each capture restores its own surface
//! locally, and [`DocumentRestorer`] is the global safety net that runs
//! on every exit path, so a mid-run failure never leaves the document
//! visibly altered.

mod blank;
mod capture;
mod enumerate;
mod slice;

pub use blank::is_blank;
pub use enumerate::{ExportPlan, PaginationStrategy, enumerate_units};
pub use slice::{page_height_px, slice_flow};

use crate::backend::DocumentSink;
use crate::constants::WHITE;
use crate::options::ExportOptions;
use crate::progress::{CancelHandle, NullObserver, ProgressObserver};
use crate::raster::Rasterizer;
use crate::tree::{Background, Marker, StyleSnapshot, SurfaceTree};
use crate::types::*;
use capture::{RoundingGuard, capture};
use std::path::Path;

/// Tracked whole-document mutations, restored in reverse order exactly
/// once. Restoring drains the tracker, so running it again is a no-op.
#[derive(Debug, Default)]
struct DocumentRestorer {
    snapshots: Vec<StyleSnapshot>,
    rounding: Option<RoundingGuard>,
}

impl DocumentRestorer {
    fn track(&mut self, snapshot: StyleSnapshot) {
        self.snapshots.push(snapshot);
    }

    fn install_rounding(&mut self, tree: &mut SurfaceTree) -> Result<()> {
        self.rounding = Some(RoundingGuard::install(tree)?);
        Ok(())
    }

    fn restore(&mut self, tree: &mut SurfaceTree) {
        if let Some(mut guard) = self.rounding.take() {
            guard.remove(tree);
        }
        while let Some(snapshot) = self.snapshots.pop() {
            tree.restore_style(snapshot);
        }
    }
}

/// Drives one export run: enumerator, capture orchestrator, blank
/// filter, overflow slicer and document sink, strictly sequential.
///
/// The tree has exactly one mutator at a time; captures never run
/// concurrently because the rasterizer and the enumerator share the
/// mutable tree.
pub struct Exporter<R, S> {
    rasterizer: R,
    sink: S,
    options: ExportOptions,
    observer: Box<dyn ProgressObserver>,
    cancel: CancelHandle,
    progress: ProgressState,
}

impl<R: Rasterizer, S: DocumentSink> Exporter<R, S> {
    pub fn new(rasterizer: R, sink: S, options: ExportOptions) -> Self {
        Self {
            rasterizer,
            sink,
            options,
            observer: Box::new(NullObserver),
            cancel: CancelHandle::new(),
            progress: ProgressState::default(),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle for requesting cancellation; checked between units only
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Take the sink back, e.g. to inspect what was assembled
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Export the tree to `output`.
    ///
    /// On any failure the document's presentation state is restored
    /// before the error is returned, and no partial document is saved.
    pub async fn export(&mut self, tree: &mut SurfaceTree, output: &Path) -> Result<ExportSummary> {
        self.options.validate()?;
        self.progress = ProgressState::default();
        self.report(0, 0, "Preparing");

        // Capability resolution and image readiness, before any mutation
        self.rasterizer.prepare(tree).await?;
        let (page_w_mm, page_h_mm) = self.options.page_dimensions_mm();
        self.sink.begin(page_w_mm, page_h_mm)?;

        let mut restorer = DocumentRestorer::default();
        let run = self.run(tree, &mut restorer).await;

        // Global safety net: runs on success, failure and cancellation
        restorer.restore(tree);
        let summary = run?;

        self.report_status("Saving");
        self.sink.save(output)?;
        self.report_status("Done");
        log::info!(
            "export complete: {} page(s), {} blank skipped",
            summary.total_pages(),
            summary.skipped_blank
        );
        Ok(summary)
    }

    async fn run(
        &mut self,
        tree: &mut SurfaceTree,
        restorer: &mut DocumentRestorer,
    ) -> Result<ExportSummary> {
        // Hide screen-only chrome, tracked for restoration
        for id in tree.descendants_with_marker(tree.root(), Marker::Chrome) {
            restorer.track(tree.snapshot_style(id));
            tree.style_mut(id).visible = false;
        }

        // Normalize whole-document background and margins
        let root = tree.root();
        restorer.track(tree.snapshot_style(root));
        let root_style = tree.style_mut(root);
        root_style.background = Background::Solid(WHITE);
        root_style.zero_margins();

        let plan = enumerate_units(tree, &self.options);
        if plan.is_empty() {
            log::info!("no capture units found; producing empty document");
            return Ok(ExportSummary::default());
        }

        let mut total = plan.provisional_total();
        let mut current = 0usize;
        self.report(current, total, "Capturing");

        restorer.install_rounding(tree)?;

        let mut summary = ExportSummary::default();
        let (page_w_mm, page_h_mm) = self.options.page_dimensions_mm();

        if let Some(unit) = plan.cover {
            self.check_cancelled()?;
            let image = capture(tree, &mut self.rasterizer, &unit, &self.options).await?;
            // A blank cover is still emitted
            self.sink.add_page()?;
            self.sink.add_image(&image, 0.0, 0.0, page_w_mm, page_h_mm)?;
            summary.has_cover = true;
            current += 1;
            self.report(current, total, "Captured cover");
        }

        match plan.strategy {
            None => {}
            Some(PaginationStrategy::Discrete(units)) => {
                for (index, unit) in units.iter().enumerate() {
                    self.check_cancelled()?;
                    let image = capture(tree, &mut self.rasterizer, unit, &self.options).await?;
                    current += 1;
                    if is_blank(&image, &self.options.blank) {
                        summary.skipped_blank += 1;
                        log::debug!("page {} is blank, skipping", index + 1);
                    } else {
                        self.sink.add_page()?;
                        self.sink.add_image(&image, 0.0, 0.0, page_w_mm, page_h_mm)?;
                        summary.content_pages += 1;
                    }
                    self.report(
                        current,
                        total,
                        format!("Captured page {} of {}", index + 1, units.len()),
                    );
                }
            }
            Some(PaginationStrategy::Flow(unit)) => {
                self.check_cancelled()?;
                summary.sliced = true;
                let image = self.capture_flow(tree, &unit).await?;

                let (content_w_mm, content_h_mm) = self.options.content_dimensions_mm();
                let slices = slice_flow(&image, content_w_mm, content_h_mm, &self.options.margins);

                // The real page count is known only after the flow capture
                total = (usize::from(summary.has_cover) + slices.len()).max(current);
                self.report(current, total, "Slicing");

                let slice_count = slices.len();
                for (index, slice) in slices.into_iter().enumerate() {
                    self.check_cancelled()?;
                    current += 1;
                    if is_blank(&slice.image, &self.options.blank) {
                        summary.skipped_blank += 1;
                        log::debug!("slice {} is blank, skipping", index + 1);
                    } else {
                        self.sink.add_page()?;
                        self.sink.add_image(
                            &slice.image,
                            slice.offset_x_mm,
                            slice.offset_y_mm,
                            slice.width_mm,
                            slice.height_mm,
                        )?;
                        summary.content_pages += 1;
                    }
                    self.report(
                        current,
                        total,
                        format!("Added slice {} of {}", index + 1, slice_count),
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Capture the flow unit with break points and category elevation
    /// flattened, so slice boundaries do not cut through a visible seam.
    /// The flattening follows the same snapshot/restore discipline as
    /// the capture itself.
    async fn capture_flow(
        &mut self,
        tree: &mut SurfaceTree,
        unit: &CaptureUnit,
    ) -> Result<RasterImage> {
        let mut snapshots = Vec::new();
        for id in tree.descendants_with_marker(unit.surface, Marker::Break) {
            snapshots.push(tree.snapshot_style(id));
            let style = tree.style_mut(id);
            style.border_top_px = 0;
            style.margin_top_px = 0;
        }
        for id in tree.descendants_with_marker(unit.surface, Marker::Category) {
            snapshots.push(tree.snapshot_style(id));
            tree.style_mut(id).shadow = false;
        }

        let outcome = capture(tree, &mut self.rasterizer, unit, &self.options).await;

        for snapshot in snapshots.into_iter().rev() {
            tree.restore_style(snapshot);
        }
        outcome
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report(&mut self, current: usize, total: usize, status: impl Into<String>) {
        // current is monotonic for the whole run
        self.progress.current = self.progress.current.max(current);
        self.progress.total = total;
        self.progress.status = status.into();
        self.observer.progress(&self.progress);
    }

    fn report_status(&mut self, status: impl Into<String>) {
        self.progress.status = status.into();
        self.observer.progress(&self.progress);
    }
}
