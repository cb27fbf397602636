//! Blank surface detection
//!
//! Classifies a rasterized page as blank by sparse sampling so empty
//! pages are not emitted. Heuristic by design: a false negative keeps a
//! near-white page, a false positive would drop content, so sampling
//! stays strictly interior where border pixels (disproportionately
//! background margin) cannot vote.

use crate::options::BlankDetection;
use crate::types::RasterImage;

/// True iff every sampled pixel is near-white on all channels.
///
/// Samples a `cols × rows` grid at evenly spaced interior coordinates;
/// the exact border is never sampled. Degenerate (zero-sized) images are
/// blank.
pub fn is_blank(image: &RasterImage, config: &BlankDetection) -> bool {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return true;
    }

    for row in 0..config.sample_grid_rows {
        let y = (h as u64 * (row as u64 + 1) / (config.sample_grid_rows as u64 + 1)) as u32;
        for col in 0..config.sample_grid_cols {
            let x = (w as u64 * (col as u64 + 1) / (config.sample_grid_cols as u64 + 1)) as u32;
            let pixel = image.get_pixel(x.min(w - 1), y.min(h - 1));
            if pixel.0.iter().any(|&channel| channel < config.white_threshold) {
                return false;
            }
        }
    }
    true
}

// =============================================================================
// Tests
// =============================================================================
