//! Document transformation primitives.
//!
//! Each primitive takes input/output file paths and reports success or
//! failure; orchestration (job lifecycle, aggregation, acknowledgment) lives
//! in the worker crate. Page-level work uses `lopdf`; office formats are
//! rasterized by an external LibreOffice process.

pub mod convert;
pub mod error;
pub mod kind;
pub mod merge;
pub mod split;

pub use convert::{convert_to_pdf, derive_pdf_path, image_to_pdf, text_to_pdf};
pub use error::{PdfError, PdfResult};
pub use kind::InputKind;
pub use merge::merge_into_pdf;
pub use split::{page_count, split_page_range};
