//! Document assembly seam
//!
//! The output document is an external capability behind [`DocumentSink`].
//! The driver opens the document, adds one page per accepted slice and
//! places its raster, then saves once, after restoration.

mod pdf;

pub use pdf::PdfSink;

use crate::types::{RasterImage, Result};
use std::path::Path;

/// External document-assembly capability.
///
/// The document starts with zero pages; the driver calls [`add_page`]
/// before each image, so an export that accepts nothing saves a document
/// with zero content pages. Failures map to
/// [`ExportError::Assembly`](crate::ExportError::Assembly).
///
/// [`add_page`]: DocumentSink::add_page
pub trait DocumentSink: Send {
    /// Open a new document with the given physical page size
    fn begin(&mut self, page_width_mm: f32, page_height_mm: f32) -> Result<()>;

    /// Append a new empty page; subsequent images land on it
    fn add_page(&mut self) -> Result<()>;

    /// Place `image` on the current page at the given physical rectangle
    fn add_image(
        &mut self,
        image: &RasterImage,
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    ) -> Result<()>;

    /// Serialize the document to `path`
    fn save(&mut self, path: &Path) -> Result<()>;
}
