//! Rasterizer seam and the in-process software rasterizer
//!
//! Rasterization is an external capability from the pipeline's point of
//! view; [`Rasterizer`] is the seam. [`SoftwareRasterizer`] is a small
//! in-process implementation that paints the surface tree's fills,
//! preloaded image files and stacked children, honoring whatever inline
//! style the capture orchestrator forced onto a surface.

use crate::constants::{IMAGE_PRELOAD_TIMEOUT, TRANSPARENT, WHITE};
use crate::tree::{Background, SurfaceContent, SurfaceId, SurfaceTree};
use crate::types::{ExportError, RasterImage, Result};
use image::Rgba;
use std::collections::HashMap;
use std::path::PathBuf;

/// Background behind a rendered surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderBackground {
    /// Transparent canvas, used for full-bleed cover art
    #[default]
    Transparent,
    /// Opaque white canvas, used for every content capture
    White,
}

/// Options passed to a rasterizer for one capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Oversampling factor (canvas pixels per style pixel)
    pub scale: f32,
    pub background: RenderBackground,
}

/// External rendering capability.
///
/// `prepare` resolves the capability and waits for embedded images
/// (bounded per image, never rejecting for an unloadable image);
/// a hard failure here is a [`ExportError::DependencyLoad`] and aborts
/// before any surface is mutated. `render` rasterizes one surface; its
/// failure is fatal to the whole export run.
pub trait Rasterizer: Send {
    fn prepare(
        &mut self,
        tree: &SurfaceTree,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn render(
        &mut self,
        tree: &SurfaceTree,
        surface: SurfaceId,
        options: &RenderOptions,
    ) -> impl std::future::Future<Output = Result<RasterImage>> + Send;
}

/// In-process rasterizer painting the surface tree with the `image` crate
#[derive(Debug, Default)]
pub struct SoftwareRasterizer {
    /// Embedded images preloaded by `prepare`; a path missing here after
    /// prepare means the image never became ready and paints as nothing
    images: HashMap<PathBuf, RasterImage>,
}

impl SoftwareRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Natural content height of a surface in style pixels: forced height
    /// if set, else intrinsic image height scaled to the surface width,
    /// else the stacked height of visible children plus padding.
    fn natural_height(&self, tree: &SurfaceTree, surface: SurfaceId, width_px: u32) -> u32 {
        let style = tree.style(surface);
        if let Some(h) = style.height_px {
            return h;
        }

        let inner_width = width_px.saturating_sub(style.padding_px * 2);
        let content_height = match tree.content(surface) {
            SurfaceContent::Image(path) => match self.images.get(path) {
                Some(img) if img.width() > 0 => {
                    (img.height() as f32 * inner_width as f32 / img.width() as f32).round() as u32
                }
                _ => 0,
            },
            _ => {
                let mut total = 0u32;
                for &child in tree.children(surface) {
                    let child_style = tree.style(child);
                    if !child_style.visible {
                        continue;
                    }
                    let child_width = child_style.width_px.unwrap_or(inner_width);
                    total += child_style.margin_top_px
                        + self.natural_height(tree, child, child_width)
                        + child_style.margin_bottom_px;
                }
                total
            }
        };

        content_height + style.padding_px * 2
    }

    /// Paint `surface` into `canvas` with its top-left box corner at
    /// (x, y) canvas pixels, clipped to `clip` (x0, y0, x1, y1).
    fn paint(
        &self,
        tree: &SurfaceTree,
        surface: SurfaceId,
        canvas: &mut RasterImage,
        x: i64,
        y: i64,
        width_px: u32,
        scale: f32,
        clip: (i64, i64, i64, i64),
    ) {
        let style = tree.style(surface);
        if !style.visible {
            return;
        }

        let height_px = self.natural_height(tree, surface, width_px);
        let box_w = (width_px as f32 * scale).round() as i64;
        let box_h = (height_px as f32 * scale).round() as i64;

        // Tighten the clip if this surface clips its overflow
        let clip = if style.overflow_clipped {
            (
                clip.0.max(x),
                clip.1.max(y),
                clip.2.min(x + box_w),
                clip.3.min(y + box_h),
            )
        } else {
            clip
        };

        if let Background::Solid(color) = style.background {
            fill_rect(canvas, x, y, box_w, box_h, color, clip);
        }
        if style.border_top_px > 0 {
            let border_h = (style.border_top_px as f32 * scale).round() as i64;
            fill_rect(canvas, x, y, box_w, border_h, [64, 64, 64, 255], clip);
        }
        if style.shadow {
            let shadow_h = (3.0 * scale).round() as i64;
            fill_rect(
                canvas,
                x,
                y + box_h,
                box_w,
                shadow_h,
                [200, 200, 200, 255],
                clip,
            );
        }

        let pad = (style.padding_px as f32 * scale).round() as i64;
        let inner_x = x + pad;
        let inner_y = y + pad;
        let inner_width = width_px.saturating_sub(style.padding_px * 2);
        let inner_w = (inner_width as f32 * scale).round() as i64;

        match tree.content(surface) {
            SurfaceContent::None => {}
            SurfaceContent::Fill(color) => {
                fill_rect(canvas, inner_x, inner_y, inner_w, box_h - 2 * pad, *color, clip);
            }
            SurfaceContent::Image(path) => {
                if let Some(img) = self.images.get(path) {
                    blit_scaled(canvas, img, inner_x, inner_y, inner_w, clip);
                }
            }
        }

        // Children stack vertically inside the padding box
        let mut cursor = inner_y;
        for &child in tree.children(surface) {
            let child_style = tree.style(child);
            if !child_style.visible {
                continue;
            }
            let child_width = child_style.width_px.unwrap_or(inner_width);
            cursor += (child_style.margin_top_px as f32 * scale).round() as i64;
            self.paint(tree, child, canvas, inner_x, cursor, child_width, scale, clip);
            let child_h =
                self.natural_height(tree, child, child_width) + child_style.margin_bottom_px;
            cursor += (child_h as f32 * scale).round() as i64;
        }
    }
}

impl Rasterizer for SoftwareRasterizer {
    async fn prepare(&mut self, tree: &SurfaceTree) -> Result<()> {
        for id in tree.iter_surfaces() {
            let SurfaceContent::Image(path) = tree.content(id) else {
                continue;
            };
            if self.images.contains_key(path) {
                continue;
            }
            let path = path.clone();
            let load = tokio::task::spawn_blocking({
                let path = path.clone();
                move || image::open(&path)
            });
            match tokio::time::timeout(IMAGE_PRELOAD_TIMEOUT, load).await {
                Ok(Ok(Ok(img))) => {
                    self.images.insert(path, img.to_rgba8());
                }
                Ok(Ok(Err(e))) => {
                    // Unloadable image degrades to nothing rendered
                    log::warn!("embedded image {} failed to load: {}", path.display(), e);
                }
                Ok(Err(e)) => {
                    return Err(ExportError::DependencyLoad(format!(
                        "image loader task failed: {}",
                        e
                    )));
                }
                Err(_) => {
                    log::warn!(
                        "embedded image {} not ready after {:?}, continuing without it",
                        path.display(),
                        IMAGE_PRELOAD_TIMEOUT
                    );
                }
            }
        }
        Ok(())
    }

    async fn render(
        &mut self,
        tree: &SurfaceTree,
        surface: SurfaceId,
        options: &RenderOptions,
    ) -> Result<RasterImage> {
        let style = tree.style(surface);
        let width_px = style.width_px.ok_or_else(|| {
            ExportError::Render("surface has no resolved width for capture".to_string())
        })?;
        let height_px = self.natural_height(tree, surface, width_px);

        let canvas_w = ((width_px as f32 * options.scale).round() as u32).max(1);
        let canvas_h = ((height_px as f32 * options.scale).round() as u32).max(1);
        let base = match options.background {
            RenderBackground::Transparent => TRANSPARENT,
            RenderBackground::White => WHITE,
        };
        let mut canvas = RasterImage::from_pixel(canvas_w, canvas_h, Rgba(base));

        let clip = (0i64, 0i64, canvas_w as i64, canvas_h as i64);
        self.paint(tree, surface, &mut canvas, 0, 0, width_px, options.scale, clip);

        Ok(canvas)
    }
}

fn fill_rect(
    canvas: &mut RasterImage,
    x: i64,
    y: i64,
    w: i64,
    h: i64,
    color: [u8; 4],
    clip: (i64, i64, i64, i64),
) {
    let x0 = x.max(clip.0).max(0);
    let y0 = y.max(clip.1).max(0);
    let x1 = (x + w).min(clip.2).min(canvas.width() as i64);
    let y1 = (y + h).min(clip.3).min(canvas.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px as u32, py as u32, Rgba(color));
        }
    }
}

/// Paint `src` scaled to `dst_w` canvas pixels wide, preserving aspect
fn blit_scaled(
    canvas: &mut RasterImage,
    src: &RasterImage,
    x: i64,
    y: i64,
    dst_w: i64,
    clip: (i64, i64, i64, i64),
) {
    if src.width() == 0 || src.height() == 0 || dst_w <= 0 {
        return;
    }
    let dst_h = (src.height() as i64 * dst_w) / src.width() as i64;
    if dst_h <= 0 {
        return;
    }
    let scaled = image::imageops::resize(
        src,
        dst_w as u32,
        dst_h as u32,
        image::imageops::FilterType::Triangle,
    );
    let x0 = x.max(clip.0).max(0);
    let y0 = y.max(clip.1).max(0);
    let x1 = (x + dst_w).min(clip.2).min(canvas.width() as i64);
    let y1 = (y + dst_h).min(clip.3).min(canvas.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = *scaled.get_pixel((px - x) as u32, (py - y) as u32);
            canvas.put_pixel(px as u32, py as u32, pixel);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::InlineStyle;

    fn style(width: Option<u32>, height: Option<u32>) -> InlineStyle {
        InlineStyle {
            width_px: width,
            height_px: height,
            ..InlineStyle::default()
        }
    }

    #[tokio::test]
    async fn test_render_fixed_canvas_at_scale() {
        let mut tree = SurfaceTree::new();
        let page = tree.add_surface(tree.root(), style(Some(100), Some(150)), SurfaceContent::None);

        let mut rasterizer = SoftwareRasterizer::new();
        let options = RenderOptions {
            scale: 2.0,
            background: RenderBackground::White,
        };
        let img = rasterizer.render(&tree, page, &options).await.unwrap();
        assert_eq!((img.width(), img.height()), (200, 300));
        assert_eq!(img.get_pixel(0, 0).0, WHITE);
    }

    #[tokio::test]
    async fn test_flow_natural_height_stacks_children() {
        let mut tree = SurfaceTree::new();
        let body = tree.add_surface(tree.root(), style(Some(100), None), SurfaceContent::None);
        tree.add_surface(body, style(None, Some(40)), SurfaceContent::Fill([0, 0, 255, 255]));
        let mut second = style(None, Some(60));
        second.margin_top_px = 10;
        tree.add_surface(body, second, SurfaceContent::Fill([255, 0, 0, 255]));

        let mut rasterizer = SoftwareRasterizer::new();
        let options = RenderOptions {
            scale: 1.0,
            background: RenderBackground::White,
        };
        let img = rasterizer.render(&tree, body, &options).await.unwrap();
        assert_eq!((img.width(), img.height()), (100, 110));
        // First block is blue, second starts after the 10px margin gap
        assert_eq!(img.get_pixel(50, 20).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(50, 45).0, WHITE);
        assert_eq!(img.get_pixel(50, 80).0, [255, 0, 0, 255]);
    }

    #[tokio::test]
    async fn test_hidden_surface_paints_nothing() {
        let mut tree = SurfaceTree::new();
        let page = tree.add_surface(tree.root(), style(Some(50), Some(50)), SurfaceContent::None);
        let mut hidden = style(None, Some(30));
        hidden.visible = false;
        tree.add_surface(page, hidden, SurfaceContent::Fill([0, 0, 0, 255]));

        let mut rasterizer = SoftwareRasterizer::new();
        let options = RenderOptions {
            scale: 1.0,
            background: RenderBackground::White,
        };
        let img = rasterizer.render(&tree, page, &options).await.unwrap();
        assert!(img.pixels().all(|p| p.0 == WHITE));
    }

    #[tokio::test]
    async fn test_missing_width_is_render_failure() {
        let mut tree = SurfaceTree::new();
        let page = tree.add_surface(tree.root(), style(None, Some(50)), SurfaceContent::None);

        let mut rasterizer = SoftwareRasterizer::new();
        let options = RenderOptions {
            scale: 1.0,
            background: RenderBackground::White,
        };
        let result = rasterizer.render(&tree, page, &options).await;
        assert!(matches!(result, Err(ExportError::Render(_))));
    }
}
