//! Format-specific conversion to PDF.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{PdfError, PdfResult};
use crate::kind::InputKind;

/// A4 media box in PDF points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 14;
const LINES_PER_PAGE: usize = 52;
const WRAP_COLUMNS: usize = 90;

/// Derive the deterministic output location for a converted input: the same
/// directory, the same stem, a `.pdf` suffix. Re-running a conversion
/// overwrites its previous output instead of duplicating it.
pub fn derive_pdf_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.pdf"))
}

/// Convert one input to PDF, dispatching on its [`InputKind`].
pub async fn convert_to_pdf(input: &Path, output: &Path) -> PdfResult<()> {
    if !input.exists() {
        return Err(PdfError::MissingInput(input.to_path_buf()));
    }

    match InputKind::from_path(input)? {
        InputKind::Office => office_to_pdf(input, output).await,
        InputKind::Text => {
            let (input, output) = (input.to_path_buf(), output.to_path_buf());
            tokio::task::spawn_blocking(move || text_to_pdf(&input, &output)).await?
        }
        InputKind::Jpeg | InputKind::Png => {
            let (input, output) = (input.to_path_buf(), output.to_path_buf());
            tokio::task::spawn_blocking(move || image_to_pdf(&input, &output)).await?
        }
    }
}

/// Convert an office document by shelling out to LibreOffice.
///
/// The converter names its product after the input stem inside `--outdir`;
/// when that differs from the requested output the file is moved into place.
async fn office_to_pdf(input: &Path, output: &Path) -> PdfResult<()> {
    let outdir = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let converter =
        std::env::var("SOFFICE_BIN").unwrap_or_else(|_| "soffice".to_string());

    debug!(input = %input.display(), output = %output.display(), "Running office converter");

    let result = Command::new(&converter)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(&outdir)
        .arg(input)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(PdfError::converter(format!(
            "{converter} exited with {}: {}",
            result.status,
            stderr.trim()
        )));
    }

    let produced = outdir.join(derive_pdf_path(input).file_name().unwrap_or_default());
    if !produced.exists() {
        return Err(PdfError::converter(format!(
            "{converter} reported success but produced no file at {}",
            produced.display()
        )));
    }

    if produced != output {
        tokio::fs::rename(&produced, output).await?;
    }

    Ok(())
}

/// Typeset a plain-text file into a paginated PDF.
pub fn text_to_pdf(input: &Path, output: &Path) -> PdfResult<()> {
    let text = std::fs::read_to_string(input)?;
    let mut doc = build_text_document(&text)?;
    doc.compress();
    doc.save(output)?;
    Ok(())
}

/// Embed an image file as a single full-bleed PDF page.
pub fn image_to_pdf(input: &Path, output: &Path) -> PdfResult<()> {
    let img = image::open(input)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        warn!(input = %input.display(), "Image has zero dimension");
        return Err(PdfError::EmptyDocument(input.to_path_buf()));
    }

    // Re-encode as JPEG so the page carries one DCT-decodable stream
    // regardless of the source format.
    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90).encode_image(&rgb)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (width as i64).into(),
                    0.into(),
                    0.into(),
                    (height as i64).into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (width as i64).into(),
            (height as i64).into(),
        ],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(output)?;
    Ok(())
}

fn build_text_document(text: &str) -> PdfResult<Document> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(WRAP_COLUMNS) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(LINES_PER_PAGE) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()],
            ),
        ];
        for line in page_lines {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        kids.push(page_id.into());
    }

    let page_total = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_total,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}
