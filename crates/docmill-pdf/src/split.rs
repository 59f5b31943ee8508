//! Page-range extraction.

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use docmill_models::SplitRange;

use crate::error::{PdfError, PdfResult};

/// Number of pages in a PDF on disk.
pub fn page_count(path: &Path) -> PdfResult<usize> {
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}

/// Extract an inclusive 1-based page range into a new document.
///
/// `end` is clamped to the document's last page; a `start` beyond the last
/// page fails. Returns the number of pages written.
pub fn split_page_range(input: &Path, output: &Path, range: SplitRange) -> PdfResult<u32> {
    if !input.exists() {
        return Err(PdfError::MissingInput(input.to_path_buf()));
    }

    let mut doc = Document::load(input)?;
    let total = doc.get_pages().len() as u32;
    if total == 0 {
        return Err(PdfError::EmptyDocument(input.to_path_buf()));
    }

    let start = range.start;
    let end = range.end.min(total);
    if start > end {
        return Err(PdfError::RangeBeyondDocument { start, last: total });
    }

    let discard: Vec<u32> = (1..=total).filter(|p| *p < start || *p > end).collect();
    if !discard.is_empty() {
        doc.delete_pages(&discard);
    }

    doc.prune_objects();
    doc.renumber_objects();
    doc.compress();
    doc.save(output)?;

    debug!(
        input = %input.display(),
        start,
        end,
        total,
        "Extracted page range"
    );

    Ok(end - start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::text_to_pdf;

    /// Build a text-backed PDF with exactly `pages` pages.
    fn fixture_pdf(dir: &Path, name: &str, pages: usize) -> std::path::PathBuf {
        let text_path = dir.join(format!("{name}.txt"));
        let body: String = (0..pages * 52).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&text_path, body).unwrap();

        let pdf_path = dir.join(format!("{name}.pdf"));
        text_to_pdf(&text_path, &pdf_path).unwrap();
        assert_eq!(page_count(&pdf_path).unwrap(), pages);
        pdf_path
    }

    #[test]
    fn range_beyond_last_page_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture_pdf(dir.path(), "ten", 10);
        let output = dir.path().join("out.pdf");

        let written = split_page_range(&input, &output, SplitRange::new(3, 100)).unwrap();
        assert_eq!(written, 8);
        assert_eq!(page_count(&output).unwrap(), 8);
    }

    #[test]
    fn full_range_copies_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture_pdf(dir.path(), "four", 4);
        let output = dir.path().join("out.pdf");

        let written = split_page_range(&input, &output, SplitRange::new(1, 4)).unwrap();
        assert_eq!(written, 4);
        assert_eq!(page_count(&output).unwrap(), 4);
    }

    #[test]
    fn single_page_range() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture_pdf(dir.path(), "three", 3);
        let output = dir.path().join("out.pdf");

        let written = split_page_range(&input, &output, SplitRange::new(2, 2)).unwrap();
        assert_eq!(written, 1);
        assert_eq!(page_count(&output).unwrap(), 1);
    }

    #[test]
    fn start_beyond_document_fails_after_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture_pdf(dir.path(), "ten2", 10);
        let output = dir.path().join("out.pdf");

        let err = split_page_range(&input, &output, SplitRange::new(15, 20)).unwrap_err();
        assert!(matches!(
            err,
            PdfError::RangeBeyondDocument { start: 15, last: 10 }
        ));
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = split_page_range(
            &dir.path().join("absent.pdf"),
            &dir.path().join("out.pdf"),
            SplitRange::new(1, 1),
        )
        .unwrap_err();
        assert!(matches!(err, PdfError::MissingInput(_)));
    }
}
