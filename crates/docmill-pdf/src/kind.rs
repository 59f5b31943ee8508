//! Closed set of supported convert inputs.

use std::path::Path;

use crate::error::{PdfError, PdfResult};

/// Input kinds the convert operation knows how to turn into PDF.
///
/// Dispatch is a closed match over this enum; an extension outside the set is
/// an explicit [`PdfError::UnsupportedFormat`], never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Office document, handed to the external converter
    Office,
    /// Plain text, typeset into a PDF
    Text,
    /// JPEG image, embedded as-is
    Jpeg,
    /// PNG image, re-encoded and embedded
    Png,
}

impl InputKind {
    /// Classify an input by its file extension.
    pub fn from_path(path: &Path) -> PdfResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "doc" | "docx" | "odt" => Ok(InputKind::Office),
            "txt" => Ok(InputKind::Text),
            "jpg" | "jpeg" => Ok(InputKind::Jpeg),
            "png" => Ok(InputKind::Png),
            _ => Err(PdfError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn known_extensions_classify() {
        assert_eq!(
            InputKind::from_path(&PathBuf::from("/x/report.DOCX")).unwrap(),
            InputKind::Office
        );
        assert_eq!(
            InputKind::from_path(&PathBuf::from("notes.txt")).unwrap(),
            InputKind::Text
        );
        assert_eq!(
            InputKind::from_path(&PathBuf::from("photo.jpeg")).unwrap(),
            InputKind::Jpeg
        );
        assert_eq!(
            InputKind::from_path(&PathBuf::from("scan.png")).unwrap(),
            InputKind::Png
        );
    }

    #[test]
    fn unknown_extension_is_an_explicit_failure() {
        let err = InputKind::from_path(&PathBuf::from("movie.mp4")).unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedFormat(_)));

        let err = InputKind::from_path(&PathBuf::from("no_extension")).unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedFormat(_)));
    }
}
