//! Shared constants for the capture pipeline
//!
//! This module centralizes magic numbers used when normalizing surfaces
//! for capture and when converting between physical and pixel units.

use std::time::Duration;

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Convert millimeters to pixels at a given DPI
#[inline]
pub fn mm_to_px(mm: f32, dpi: f32) -> f32 {
    mm * dpi / MM_PER_INCH
}

// =============================================================================
// Capture Defaults
// =============================================================================

/// Default raster resolution (CSS reference pixel density)
pub const DEFAULT_DPI: f32 = 96.0;

/// Default oversampling factor for print-quality rasters
pub const DEFAULT_OVERSAMPLE: f32 = 2.0;

/// Padding forced onto containers captured as pages without an explicit
/// page marker, matching the padding of marked pages so header
/// negative-margin offsets stay visually consistent across both paths.
pub const PAGE_PADDING_MM: f32 = 10.0;

/// Opaque white, the background forced onto every non-cover capture
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Fully transparent, the background used for full-bleed cover art
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

// =============================================================================
// Blank Detection Defaults
// =============================================================================

/// Default sample grid columns for blank-page detection
pub const BLANK_SAMPLE_COLS: u32 = 5;

/// Default sample grid rows for blank-page detection
pub const BLANK_SAMPLE_ROWS: u32 = 4;

/// Default near-white channel threshold (0-255) for blank-page detection
pub const BLANK_WHITE_THRESHOLD: u8 = 250;

// =============================================================================
// External Readiness
// =============================================================================

/// Upper bound on waiting for any single embedded image to load
pub const IMAGE_PRELOAD_TIMEOUT: Duration = Duration::from_secs(5);
