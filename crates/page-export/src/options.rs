use crate::constants::*;
use crate::types::*;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunable policy for the blank-page heuristic.
///
/// Sampling is approximate on purpose: false negatives (barely-off-white
/// kept as content) are acceptable, false positives (content dropped) are
/// not, which is also why border pixels are never sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlankDetection {
    pub sample_grid_cols: u32,
    pub sample_grid_rows: u32,
    /// Channel value (0-255) at or above which a sample counts as white
    pub white_threshold: u8,
}

impl Default for BlankDetection {
    fn default() -> Self {
        Self {
            sample_grid_cols: BLANK_SAMPLE_COLS,
            sample_grid_rows: BLANK_SAMPLE_ROWS,
            white_threshold: BLANK_WHITE_THRESHOLD,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportOptions {
    // Physical page
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub margins: PageMargins,

    // Raster quality
    pub dpi: f32,
    /// Oversampling factor applied by the rasterizer for print quality
    pub oversample: f32,

    // Policies
    pub blank: BlankDetection,
    /// Per-unit capture timeout; `None` disables the watchdog
    pub capture_timeout: Option<Duration>,

    // Output metadata
    pub title: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            margins: PageMargins::default(),
            dpi: DEFAULT_DPI,
            oversample: DEFAULT_OVERSAMPLE,
            blank: BlankDetection::default(),
            capture_timeout: None,
            title: "Document".to_string(),
        }
    }
}

impl ExportOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ExportError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(ExportError::Config("DPI must be positive".to_string()));
        }
        if !self.oversample.is_finite() || self.oversample <= 0.0 {
            return Err(ExportError::Config(
                "Oversampling factor must be positive".to_string(),
            ));
        }
        if self.blank.sample_grid_cols == 0 || self.blank.sample_grid_rows == 0 {
            return Err(ExportError::Config(
                "Blank sample grid must have at least one column and row".to_string(),
            ));
        }
        let (cw, ch) = self.content_dimensions_mm();
        if cw <= 0.0 || ch <= 0.0 {
            return Err(ExportError::Config(
                "Margins leave no content area on the page".to_string(),
            ));
        }
        Ok(())
    }

    /// Physical page dimensions with orientation applied, in millimeters
    pub fn page_dimensions_mm(&self) -> (f32, f32) {
        self.paper_size.dimensions_with_orientation(self.orientation)
    }

    /// Content area (page minus margins), in millimeters
    pub fn content_dimensions_mm(&self) -> (f32, f32) {
        let (w, h) = self.page_dimensions_mm();
        (
            w - self.margins.left_mm - self.margins.right_mm,
            h - self.margins.top_mm - self.margins.bottom_mm,
        )
    }

    /// Target pixel canvas for a full page at the configured DPI
    pub fn page_dimensions_px(&self) -> (u32, u32) {
        let (w, h) = self.page_dimensions_mm();
        (
            mm_to_px(w, self.dpi).round() as u32,
            mm_to_px(h, self.dpi).round() as u32,
        )
    }

    /// Target pixel width of the content area at the configured DPI
    pub fn content_width_px(&self) -> u32 {
        let (cw, _) = self.content_dimensions_mm();
        mm_to_px(cw, self.dpi).round() as u32
    }
}
