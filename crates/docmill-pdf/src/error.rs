//! Transformation error types.

use std::path::PathBuf;
use thiserror::Error;

pub type PdfResult<T> = Result<T, PdfError>;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("Document has no pages: {0}")]
    EmptyDocument(PathBuf),

    #[error("Invalid page range: start={start} exceeds last page {last}")]
    RangeBeyondDocument { start: u32, last: u32 },

    #[error("External converter failed: {0}")]
    Converter(String),

    #[error("Malformed PDF: {0}")]
    Malformed(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl PdfError {
    pub fn converter(msg: impl Into<String>) -> Self {
        Self::Converter(msg.into())
    }
}
