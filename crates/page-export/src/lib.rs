pub mod backend;
mod constants;
pub mod export;
mod options;
mod progress;
mod raster;
mod tree;
mod types;

pub use backend::{DocumentSink, PdfSink};
pub use constants::PAGE_PADDING_MM;
pub use export::{ExportPlan, Exporter, PaginationStrategy, enumerate_units};
pub use options::*;
pub use progress::*;
pub use raster::{Rasterizer, RenderBackground, RenderOptions, SoftwareRasterizer};
pub use tree::*;
pub use types::*;
