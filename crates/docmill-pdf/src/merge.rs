//! Page-sequence concatenation.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::{PdfError, PdfResult};

/// Concatenate every input, in input order, into one output document.
///
/// Returns the total number of pages written.
pub fn merge_into_pdf<P: AsRef<Path>>(inputs: &[P], output: &Path) -> PdfResult<usize> {
    if inputs.is_empty() {
        return Err(PdfError::Malformed("nothing to merge".to_string()));
    }

    let mut max_id = 1;
    // Pages in input order; all other objects keyed by their renumbered id.
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in inputs {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PdfError::MissingInput(path.to_path_buf()));
        }

        let mut doc = Document::load(path)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc.get_object(page_id)?.to_owned();
            pages.push((page_id, page));
        }
        objects.extend(std::mem::take(&mut doc.objects));
    }

    if pages.is_empty() {
        return Err(PdfError::Malformed("inputs contain no pages".to_string()));
    }

    let mut document = Document::with_version("1.5");

    // Catalog and Pages roots are rebuilt; everything else carries over.
    let mut catalog_object: Option<(ObjectId, Object)> = None;
    let mut pages_object: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects.iter() {
        match object.type_name().unwrap_or("") {
            "Catalog" => {
                catalog_object = Some((
                    catalog_object
                        .as_ref()
                        .map(|(id, _)| *id)
                        .unwrap_or(*object_id),
                    object.clone(),
                ));
            }
            "Pages" => {
                if let Ok(dictionary) = object.as_dict() {
                    let mut dictionary = dictionary.clone();
                    if let Some((_, ref existing)) = pages_object {
                        if let Ok(existing) = existing.as_dict() {
                            dictionary.extend(existing);
                        }
                    }
                    pages_object = Some((
                        pages_object
                            .as_ref()
                            .map(|(id, _)| *id)
                            .unwrap_or(*object_id),
                        Object::Dictionary(dictionary),
                    ));
                }
            }
            "Page" | "Outlines" | "Outline" => {}
            _ => {
                document.objects.insert(*object_id, object.clone());
            }
        }
    }

    let (pages_root_id, pages_root) = pages_object
        .ok_or_else(|| PdfError::Malformed("no Pages root found".to_string()))?;
    let (catalog_id, catalog) = catalog_object
        .ok_or_else(|| PdfError::Malformed("no Catalog found".to_string()))?;

    // Re-parent every page under the single surviving Pages root.
    for (page_id, page) in pages.iter() {
        if let Ok(dictionary) = page.as_dict() {
            let mut dictionary = dictionary.clone();
            dictionary.set("Parent", pages_root_id);
            document
                .objects
                .insert(*page_id, Object::Dictionary(dictionary));
        }
    }

    if let Ok(dictionary) = pages_root.as_dict() {
        let mut dictionary = dictionary.clone();
        dictionary.set("Count", pages.len() as i64);
        dictionary.set(
            "Kids",
            pages
                .iter()
                .map(|(id, _)| Object::Reference(*id))
                .collect::<Vec<_>>(),
        );
        document
            .objects
            .insert(pages_root_id, Object::Dictionary(dictionary));
    }

    if let Ok(dictionary) = catalog.as_dict() {
        let mut dictionary = dictionary.clone();
        dictionary.set("Pages", pages_root_id);
        dictionary.remove(b"Outlines");
        document
            .objects
            .insert(catalog_id, Object::Dictionary(dictionary));
    }

    document.trailer.set("Root", catalog_id);
    document.max_id = document.objects.len() as u32;
    document.renumber_objects();
    document.prune_objects();
    document.compress();
    document.save(output)?;

    debug!(
        inputs = inputs.len(),
        pages = pages.len(),
        output = %output.display(),
        "Merged documents"
    );

    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::text_to_pdf;
    use crate::split::page_count;

    fn fixture_pdf(dir: &Path, name: &str, pages: usize) -> std::path::PathBuf {
        let text_path = dir.join(format!("{name}.txt"));
        let body: String = (0..pages * 52).map(|i| format!("{name} line {i}\n")).collect();
        std::fs::write(&text_path, body).unwrap();

        let pdf_path = dir.join(format!("{name}.pdf"));
        text_to_pdf(&text_path, &pdf_path).unwrap();
        pdf_path
    }

    #[test]
    fn merged_page_count_is_the_sum_of_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixture_pdf(dir.path(), "a", 1);
        let b = fixture_pdf(dir.path(), "b", 1);
        let output = dir.path().join("merged.pdf");

        let pages = merge_into_pdf(&[&a, &b], &output).unwrap();
        assert_eq!(pages, 2);
        assert_eq!(page_count(&output).unwrap(), 2);
    }

    #[test]
    fn merge_preserves_input_order_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixture_pdf(dir.path(), "first", 3);
        let b = fixture_pdf(dir.path(), "second", 2);
        let c = fixture_pdf(dir.path(), "third", 1);
        let output = dir.path().join("merged.pdf");

        let pages = merge_into_pdf(&[&a, &b, &c], &output).unwrap();
        assert_eq!(pages, 6);
        assert_eq!(page_count(&output).unwrap(), 6);
    }

    #[test]
    fn missing_input_aborts_the_merge() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixture_pdf(dir.path(), "only", 1);
        let missing = dir.path().join("gone.pdf");
        let output = dir.path().join("merged.pdf");

        let err = merge_into_pdf(&[a, missing], &output).unwrap_err();
        assert!(matches!(err, PdfError::MissingInput(_)));
        assert!(!output.exists());
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<std::path::PathBuf> = Vec::new();
        let err = merge_into_pdf(&inputs, &dir.path().join("merged.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Malformed(_)));
    }
}
