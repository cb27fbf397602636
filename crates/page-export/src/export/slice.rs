//! Overflow slicing for the flow fallback path
//!
//! When no discrete page surfaces exist, the body is captured once as a
//! single tall raster and partitioned here into page-sized slices. The
//! pixel-per-millimeter ratio comes from the raster width against the
//! physical content width, so the slice geometry is exact regardless of
//! the oversampling factor used at capture time.

use crate::constants::WHITE;
use crate::types::{PageMargins, PageSlice, RasterImage};
use image::Rgba;

/// Page height in pixels for a flow raster of the given width
pub fn page_height_px(image_width: u32, content_w_mm: f32, content_h_mm: f32) -> u32 {
    let px_per_mm = image_width as f32 / content_w_mm;
    ((content_h_mm * px_per_mm).round() as u32).max(1)
}

/// Partition one tall flow raster into fixed-height page slices.
///
/// Slice heights sum exactly to the source height; the count is
/// `ceil(height / page_height_px)`. Every slice is composited over
/// opaque white so a short final slice still reads as a full white page.
/// Each slice is emitted at the content-margin offset.
pub fn slice_flow(
    image: &RasterImage,
    content_w_mm: f32,
    content_h_mm: f32,
    margins: &PageMargins,
) -> Vec<PageSlice> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let px_per_mm = w as f32 / content_w_mm;
    let page_px = page_height_px(w, content_w_mm, content_h_mm);

    let mut slices = Vec::with_capacity(h.div_ceil(page_px) as usize);
    let mut y = 0u32;
    while y < h {
        let slice_px = page_px.min(h - y);
        let mut canvas = RasterImage::from_pixel(w, slice_px, Rgba(WHITE));
        let region = image::imageops::crop_imm(image, 0, y, w, slice_px).to_image();
        image::imageops::overlay(&mut canvas, &region, 0, 0);

        slices.push(PageSlice {
            image: canvas,
            offset_x_mm: margins.left_mm,
            offset_y_mm: margins.top_mm,
            width_mm: content_w_mm,
            height_mm: slice_px as f32 / px_per_mm,
        });
        y += slice_px;
    }
    slices
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_image(w: u32, h: u32) -> RasterImage {
        RasterImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
    }

    // A4 content area with 10mm margins: 190mm x 277mm
    const CW: f32 = 190.0;
    const CH: f32 = 277.0;

    #[test]
    fn test_slice_count_and_coverage() {
        let image = flow_image(760, 5000);
        let page_px = page_height_px(760, CW, CH);
        let slices = slice_flow(&image, CW, CH, &PageMargins::default());

        assert_eq!(slices.len() as u32, 5000u32.div_ceil(page_px));
        let total: u32 = slices.iter().map(|s| s.image.height()).sum();
        assert_eq!(total, 5000);
        for slice in &slices[..slices.len() - 1] {
            assert_eq!(slice.image.height(), page_px);
        }
        let last = slices.last().unwrap();
        let expected_last = if 5000 % page_px == 0 {
            page_px
        } else {
            5000 % page_px
        };
        assert_eq!(last.image.height(), expected_last);
    }

    #[test]
    fn test_exact_multiple_has_full_last_slice() {
        let page_px = page_height_px(760, CW, CH);
        let image = flow_image(760, page_px * 3);
        let slices = slice_flow(&image, CW, CH, &PageMargins::default());

        assert_eq!(slices.len(), 3);
        assert!(slices.iter().all(|s| s.image.height() == page_px));
    }

    #[test]
    fn test_short_content_is_one_slice() {
        let image = flow_image(760, 100);
        let slices = slice_flow(&image, CW, CH, &PageMargins::default());

        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].image.height(), 100);
    }

    #[test]
    fn test_slice_offsets_and_physical_size() {
        let margins = PageMargins {
            top_mm: 12.0,
            right_mm: 8.0,
            bottom_mm: 15.0,
            left_mm: 9.0,
        };
        let image = flow_image(380, 1000);
        let px_per_mm = 380.0 / CW;
        let slices = slice_flow(&image, CW, CH, &margins);

        for slice in &slices {
            assert_eq!(slice.offset_x_mm, 9.0);
            assert_eq!(slice.offset_y_mm, 12.0);
            assert_eq!(slice.width_mm, CW);
            let expected_mm = slice.image.height() as f32 / px_per_mm;
            assert!((slice.height_mm - expected_mm).abs() < 1e-4);
        }
    }

    #[test]
    fn test_slices_keep_source_pixels() {
        let mut image = flow_image(100, 300);
        image.put_pixel(50, 250, Rgba([255, 0, 0, 255]));
        // 100px wide at 190mm content width; page height lands well below 300
        let page_px = page_height_px(100, CW, CH);
        let slices = slice_flow(&image, CW, CH, &PageMargins::default());

        let slice_index = (250 / page_px) as usize;
        let local_y = 250 % page_px;
        assert_eq!(slices[slice_index].image.get_pixel(50, local_y).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_empty_image_yields_no_slices() {
        let image = RasterImage::new(0, 0);
        assert!(slice_flow(&image, CW, CH, &PageMargins::default()).is_empty());
    }
}
