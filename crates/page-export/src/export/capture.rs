//! Capture orchestration
//!
//! Normalizes one surface's presentation to a fixed pixel canvas, runs
//! the external rasterizer and restores the prior presentation on every
//! exit path. A render failure aborts the whole export; pages are
//! order-dependent and a partial document misleads the reader.

use crate::constants::{PAGE_PADDING_MM, WHITE, mm_to_px};
use crate::options::ExportOptions;
use crate::raster::{Rasterizer, RenderBackground, RenderOptions};
use crate::tree::{Background, Marker, SurfaceTree};
use crate::types::{CaptureKind, CaptureUnit, ExportError, RasterImage, Result};

/// Capture one unit: snapshot, normalize, rasterize, restore.
pub(crate) async fn capture<R: Rasterizer>(
    tree: &mut SurfaceTree,
    rasterizer: &mut R,
    unit: &CaptureUnit,
    options: &ExportOptions,
) -> Result<RasterImage> {
    let snapshot = tree.snapshot_style(unit.surface);
    apply_capture_style(tree, unit, options);

    let render_options = RenderOptions {
        scale: options.oversample,
        background: match unit.kind {
            // Transparent so full-bleed cover art shows through
            CaptureKind::Cover => RenderBackground::Transparent,
            _ => RenderBackground::White,
        },
    };

    let outcome = match options.capture_timeout {
        Some(limit) => {
            match tokio::time::timeout(limit, rasterizer.render(tree, unit.surface, &render_options))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ExportError::CaptureTimeout(limit)),
            }
        }
        None => rasterizer.render(tree, unit.surface, &render_options).await,
    };

    // Restore before propagating so the tree is clean on every exit path
    tree.restore_style(snapshot);
    outcome
}

fn apply_capture_style(tree: &mut SurfaceTree, unit: &CaptureUnit, options: &ExportOptions) {
    let is_marked_page = tree.has_marker(unit.surface, Marker::Page);
    let style = tree.style_mut(unit.surface);

    style.width_px = Some(unit.target_width_px);
    style.height_px = unit.target_height_px;
    style.overflow_clipped = true;
    style.zero_margins();
    style.background = match unit.kind {
        CaptureKind::Cover => Background::Transparent,
        _ => Background::Solid(WHITE),
    };

    // A generic container captured as a page gets the same padding as an
    // explicit page marker, keeping header negative-margin offsets
    // consistent between the two paths
    if !is_marked_page && unit.kind != CaptureKind::Cover {
        style.padding_px = mm_to_px(PAGE_PADDING_MM, options.dpi).round() as u32;
    }
}

/// Process-wide corner-rounding suppression for the capture window.
///
/// Installed once before the first capture and removed exactly once
/// after the last; rounded corners would otherwise leave artifacts at
/// clipped raster edges. Double install is rejected, removal is
/// idempotent.
#[derive(Debug)]
pub(crate) struct RoundingGuard {
    installed: bool,
}

impl RoundingGuard {
    pub(crate) fn install(tree: &mut SurfaceTree) -> Result<Self> {
        if tree.rounding_suppressed() {
            return Err(ExportError::Config(
                "corner-rounding suppression already installed".to_string(),
            ));
        }
        tree.set_rounding_suppressed(true);
        Ok(Self { installed: true })
    }

    pub(crate) fn remove(&mut self, tree: &mut SurfaceTree) {
        if self.installed {
            tree.set_rounding_suppressed(false);
            self.installed = false;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SoftwareRasterizer;
    use crate::tree::{InlineStyle, SurfaceContent};

    fn page_unit(tree: &mut SurfaceTree) -> CaptureUnit {
        let surface = tree.add_surface(
            tree.root(),
            InlineStyle {
                margin_top_px: 12,
                corner_radius_px: 6,
                ..InlineStyle::default()
            },
            SurfaceContent::None,
        );
        tree.add_marker(surface, Marker::Page);
        CaptureUnit {
            kind: CaptureKind::Page,
            surface,
            target_width_px: 100,
            target_height_px: Some(140),
        }
    }

    #[tokio::test]
    async fn test_capture_restores_style() {
        let mut tree = SurfaceTree::new();
        let unit = page_unit(&mut tree);
        let before = tree.style(unit.surface).clone();

        let mut rasterizer = SoftwareRasterizer::new();
        let image = capture(&mut tree, &mut rasterizer, &unit, &ExportOptions::default())
            .await
            .unwrap();

        assert_eq!((image.width(), image.height()), (200, 280));
        assert_eq!(*tree.style(unit.surface), before);
    }

    #[tokio::test]
    async fn test_unmarked_container_gets_page_padding() {
        let mut tree = SurfaceTree::new();
        let body = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
        let unit = CaptureUnit {
            kind: CaptureKind::Flow,
            surface: body,
            target_width_px: 200,
            target_height_px: None,
        };

        let options = ExportOptions::default();
        apply_capture_style(&mut tree, &unit, &options);
        let expected = mm_to_px(PAGE_PADDING_MM, options.dpi).round() as u32;
        assert_eq!(tree.style(body).padding_px, expected);

        let marked = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
        tree.add_marker(marked, Marker::Page);
        let unit = CaptureUnit {
            kind: CaptureKind::Page,
            surface: marked,
            target_width_px: 200,
            target_height_px: Some(280),
        };
        apply_capture_style(&mut tree, &unit, &options);
        assert_eq!(tree.style(marked).padding_px, 0);
    }

    #[tokio::test]
    async fn test_rounding_guard_rejects_double_install() {
        let mut tree = SurfaceTree::new();
        let mut guard = RoundingGuard::install(&mut tree).unwrap();
        assert!(tree.rounding_suppressed());
        assert!(RoundingGuard::install(&mut tree).is_err());

        guard.remove(&mut tree);
        assert!(!tree.rounding_suppressed());
        // Removal is idempotent
        guard.remove(&mut tree);
        assert!(!tree.rounding_suppressed());
    }
}
