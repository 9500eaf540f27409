//! Uploaded document handling: type detection, size/emptiness checks and plain-text
//! extraction for PDF and DOCX files.

use std::io::{Cursor, Read};

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
}

impl DocumentKind {
    /// Detects the kind from the file extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        match extension(filename)?.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    /// Whether plain text can be pulled out locally, without a model call.
    pub fn is_text_document(self) -> bool {
        matches!(self, DocumentKind::Pdf | DocumentKind::Docx)
    }

    pub fn processing_method(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF text extraction",
            DocumentKind::Docx => "Word document parsing",
            DocumentKind::Image => "Image text recognition",
        }
    }
}

/// Lower-cased extension after the last `.`, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// MIME type for an image upload, used when the image is attached to a prompt.
pub fn image_mime_type(filename: &str) -> Option<&'static str> {
    match extension(filename)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type. Supported formats: PDF, DOCX")]
    Unsupported,

    #[error("File size ({size_mb:.1}MB) exceeds limit ({limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    #[error("File is empty")]
    Empty,

    #[error("Cannot extract text from PDF: {0}")]
    Pdf(String),

    #[error("Cannot read Word document: {0}")]
    Docx(String),
}

/// Checks type, then size, then emptiness. Only PDF and DOCX pass.
pub fn validate_file(bytes: &[u8], filename: &str, max_mb: u64) -> Result<DocumentKind, DocumentError> {
    let kind = DocumentKind::from_filename(filename)
        .filter(|k| k.is_text_document())
        .ok_or(DocumentError::Unsupported)?;

    let size_mb = bytes.len() as f64 / MIB;
    if size_mb > max_mb as f64 {
        return Err(DocumentError::TooLarge {
            size_mb,
            limit_mb: max_mb,
        });
    }

    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }

    Ok(kind)
}

/// Extracts text on the blocking pool. Any failure (including a panicking parser)
/// degrades to an empty string.
pub async fn extract_text(bytes: Bytes, kind: DocumentKind) -> String {
    match try_extract_text(bytes, kind).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Text extraction failed: {e}");
            String::new()
        }
    }
}

/// Same as [`extract_text`] but reports why extraction failed.
pub async fn try_extract_text(bytes: Bytes, kind: DocumentKind) -> Result<String, DocumentError> {
    let joined = tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, kind)).await;
    match joined {
        Ok(result) => result,
        Err(e) => Err(match kind {
            DocumentKind::Docx => DocumentError::Docx(e.to_string()),
            _ => DocumentError::Pdf(e.to_string()),
        }),
    }
}

pub fn extract_text_blocking(bytes: &[u8], kind: DocumentKind) -> Result<String, DocumentError> {
    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map(|text| text.trim().to_string())
            .map_err(|e| DocumentError::Pdf(e.to_string())),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Image => Ok(String::new()),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocumentError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| DocumentError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| DocumentError::Docx(e.to_string()))?;
    docx_xml_to_text(&xml)
}

/// Body paragraphs first, then one line per table row with non-empty cells
/// joined by ` | `.
fn docx_xml_to_text(xml: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();

    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row_cells: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br") {
                    paragraph.push(' ');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| DocumentError::Docx(e.to_string()))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = std::mem::take(&mut paragraph);
                    if table_depth > 0 {
                        if !cell.is_empty() && !text.trim().is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(text.trim());
                    } else if !text.trim().is_empty() {
                        paragraphs.push(text);
                    }
                }
                b"w:tc" => {
                    let text = std::mem::take(&mut cell);
                    if !text.trim().is_empty() {
                        row_cells.push(text.trim().to_string());
                    }
                }
                b"w:tr" => {
                    if !row_cells.is_empty() {
                        rows.push(row_cells.join(" | "));
                    }
                    row_cells.clear();
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::Docx(e.to_string())),
            _ => {}
        }
    }

    paragraphs.extend(rows);
    Ok(paragraphs.join("\n").trim().to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub file_type: DocumentKind,
    pub file_size_mb: f64,
    pub text_length: usize,
    pub processing_method: &'static str,
}

pub fn file_info(bytes: &[u8], filename: &str, kind: DocumentKind, text: &str) -> FileInfo {
    FileInfo {
        filename: filename.to_string(),
        file_type: kind,
        file_size_mb: bytes.len() as f64 / MIB,
        text_length: text.chars().count(),
        processing_method: kind.processing_method(),
    }
}

/// `file_info` as reported to clients: full details, or the rejection reason.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Processed(FileInfo),
    Rejected { filename: String, error: String },
}
