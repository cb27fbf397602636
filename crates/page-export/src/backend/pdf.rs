//! PDF assembly backend built on printpdf
//!
//! Rasters are re-encoded as PNG and embedded as image XObjects, one
//! page per accepted slice. Placement is in millimeters from the page's
//! top-left corner, converted to PDF points from the bottom-left.

use super::DocumentSink;
use crate::types::{ExportError, RasterImage, Result};
use printpdf::image::RawImage;
use printpdf::ops::Op;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rect, XObjectId};
use std::io::Cursor;
use std::path::Path;

/// [`DocumentSink`] writing a PDF via printpdf
pub struct PdfSink {
    document: PdfDocument,
    pages: Vec<PdfPage>,
    current_ops: Option<Vec<Op>>,
    page_width_mm: f32,
    page_height_mm: f32,
}

impl PdfSink {
    pub fn new(title: &str) -> Self {
        Self {
            document: PdfDocument::new(title),
            pages: Vec::new(),
            current_ops: None,
            page_width_mm: 0.0,
            page_height_mm: 0.0,
        }
    }

    /// Pages in the document so far, counting the one being built
    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current_ops.is_some())
    }

    fn page_rect(&self) -> Rect {
        Rect {
            x: Pt(0.0),
            y: Pt(0.0),
            width: Mm(self.page_width_mm).into_pt(),
            height: Mm(self.page_height_mm).into_pt(),
            mode: None,
            winding_order: None,
        }
    }

    fn flush_page(&mut self) {
        if let Some(ops) = self.current_ops.take() {
            self.pages.push(PdfPage {
                media_box: self.page_rect(),
                trim_box: self.page_rect(),
                crop_box: self.page_rect(),
                ops,
            });
        }
    }
}

impl DocumentSink for PdfSink {
    fn begin(&mut self, page_width_mm: f32, page_height_mm: f32) -> Result<()> {
        self.page_width_mm = page_width_mm;
        self.page_height_mm = page_height_mm;
        self.pages.clear();
        self.current_ops = None;
        Ok(())
    }

    fn add_page(&mut self) -> Result<()> {
        self.flush_page();
        self.current_ops = Some(Vec::new());
        Ok(())
    }

    fn add_image(
        &mut self,
        image: &RasterImage,
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    ) -> Result<()> {
        let ops = self.current_ops.as_mut().ok_or_else(|| {
            ExportError::Assembly("add_image called before add_page".to_string())
        })?;

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| ExportError::Assembly(format!("Failed to encode raster: {}", e)))?;

        let mut warnings = Vec::new();
        let raw = RawImage::decode_from_bytes(&png, &mut warnings)
            .map_err(|e| ExportError::Assembly(format!("Failed to embed raster: {}", e)))?;
        let (img_w, img_h) = (raw.width as f32, raw.height as f32);

        let xobj_id = XObjectId::new();
        self.document
            .resources
            .xobjects
            .map
            .insert(xobj_id.clone(), XObject::Image(raw));

        // PDF origin is bottom-left; placement arrives top-left
        let width_pt = Mm(width_mm).into_pt();
        let height_pt = Mm(height_mm).into_pt();
        let x_pt = Mm(x_mm).into_pt();
        let y_pt = Mm(self.page_height_mm - y_mm - height_mm).into_pt();

        ops.push(Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(x_pt),
                translate_y: Some(y_pt),
                scale_x: Some(width_pt.0 / img_w),
                scale_y: Some(height_pt.0 / img_h),
                rotate: None,
                dpi: Some(72.0),
            },
        });
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.flush_page();
        self.document.pages = std::mem::take(&mut self.pages);

        let mut warnings = Vec::new();
        let bytes = self.document.save(&PdfSaveOptions::default(), &mut warnings);
        std::fs::write(path, bytes)
            .map_err(|e| ExportError::Assembly(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }
}
