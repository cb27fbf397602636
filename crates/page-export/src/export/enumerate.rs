//! Page enumeration
//!
//! Decides the ordered list of capture units for one export run: an
//! optional cover unit, then either discrete page units found in the
//! body container or a single flow unit handed to the overflow slicer.

use crate::options::ExportOptions;
use crate::tree::{Marker, SurfaceTree};
use crate::types::{CaptureKind, CaptureUnit};

/// The branch taken once per run: discrete page units, or one flow
/// capture to be sliced
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationStrategy {
    Discrete(Vec<CaptureUnit>),
    Flow(CaptureUnit),
}

/// Ordered capture plan for one export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub cover: Option<CaptureUnit>,
    pub strategy: Option<PaginationStrategy>,
}

impl ExportPlan {
    /// Unit count before slicing; for the flow path this is provisional
    /// until the slice count is known
    pub fn provisional_total(&self) -> usize {
        let content = match &self.strategy {
            Some(PaginationStrategy::Discrete(units)) => units.len(),
            Some(PaginationStrategy::Flow(_)) => 1,
            None => 0,
        };
        usize::from(self.cover.is_some()) + content
    }

    pub fn is_empty(&self) -> bool {
        self.cover.is_none() && self.strategy.is_none()
    }
}

/// Enumerate capture units in document order.
///
/// Priority inside the body container: explicit page markers, then
/// section markers, then the body itself as one flow unit. A tree with
/// no cover and no body yields an empty plan, which the driver treats
/// as a no-op success.
pub fn enumerate_units(tree: &SurfaceTree, options: &ExportOptions) -> ExportPlan {
    let (page_w_px, page_h_px) = options.page_dimensions_px();

    let cover = tree.cover().map(|surface| CaptureUnit {
        kind: CaptureKind::Cover,
        surface,
        target_width_px: page_w_px,
        target_height_px: Some(page_h_px),
    });

    let strategy = tree.body().map(|body| {
        let mut pages = tree.descendants_with_marker(body, Marker::Page);
        if pages.is_empty() {
            pages = tree.descendants_with_marker(body, Marker::Section);
        }
        if pages.is_empty() {
            // Flow capture is clamped to the content width; its height is
            // natural and becomes known only after the capture
            PaginationStrategy::Flow(CaptureUnit {
                kind: CaptureKind::Flow,
                surface: body,
                target_width_px: options.content_width_px(),
                target_height_px: None,
            })
        } else {
            PaginationStrategy::Discrete(
                pages
                    .into_iter()
                    .map(|surface| CaptureUnit {
                        kind: CaptureKind::Page,
                        surface,
                        target_width_px: page_w_px,
                        target_height_px: Some(page_h_px),
                    })
                    .collect(),
            )
        }
    });

    ExportPlan { cover, strategy }
}

// =============================================================================
// Tests
// =============================================================================
