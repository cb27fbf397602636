use crate::tree::SurfaceId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Dependency load failure: {0}")]
    DependencyLoad(String),
    #[error("Render failure: {0}")]
    Render(String),
    #[error("Capture timed out after {0:?}")]
    CaptureTimeout(Duration),
    #[error("Document assembly failure: {0}")]
    Assembly(String),
    #[error("Export cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Opaque 2D pixel buffer produced by a rasterizer
pub type RasterImage = image::RgbaImage;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Fixed content margins in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageMargins {
    pub top_mm: f32,
    pub right_mm: f32,
    pub bottom_mm: f32,
    pub left_mm: f32,
}

impl PageMargins {
    pub fn uniform(mm: f32) -> Self {
        Self {
            top_mm: mm,
            right_mm: mm,
            bottom_mm: mm,
            left_mm: mm,
        }
    }
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

/// What a capture unit represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Full-bleed cover surface, emitted first and never blank-checked
    Cover,
    /// One discrete content page
    Page,
    /// The whole body container, captured once and sliced into pages
    Flow,
}

/// One unit of capture work, produced by the enumerator and consumed once
/// by the capture orchestrator. Never outlives the export run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureUnit {
    pub kind: CaptureKind,
    pub surface: SurfaceId,
    pub target_width_px: u32,
    /// `None` means natural content height (the flow unit)
    pub target_height_px: Option<u32>,
}

/// The unit actually appended to the output document
#[derive(Debug, Clone)]
pub struct PageSlice {
    pub image: RasterImage,
    pub offset_x_mm: f32,
    pub offset_y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Informational progress triple; `current` is monotonic non-decreasing
/// and never exceeds `total` within one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub current: usize,
    pub total: usize,
    pub status: String,
}

/// What an export run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Whether a cover page was emitted
    pub has_cover: bool,
    /// Content pages emitted (excluding the cover)
    pub content_pages: usize,
    /// Captured pages or slices dropped as blank
    pub skipped_blank: usize,
    /// Whether the flow-slicing fallback path ran
    pub sliced: bool,
}

impl ExportSummary {
    /// Total pages in the output document
    pub fn total_pages(&self) -> usize {
        self.content_pages + usize::from(self.has_cover)
    }
}
