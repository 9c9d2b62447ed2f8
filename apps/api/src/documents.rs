//! Text extraction from uploaded CV files.
//!
//! Dispatch is purely by file extension: `.txt` is read as UTF-8, `.pdf`
//! goes through `pdf-extract`, `.docx`/`.doc` through `docx-rs` with
//! paragraph text joined by newlines. No OCR, no layout awareness, no
//! encoding fallback beyond UTF-8.

use std::path::Path;

use thiserror::Error;

/// File extensions accepted for upload and extraction.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["txt", "pdf", "docx", "doc"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    #[error("Error reading file: {0}")]
    Read(String),
}

/// Returns true when the filename carries an allowed extension.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extracts plain text from a stored upload.
pub fn extract_text(path: &Path) -> Result<String, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => std::fs::read_to_string(path).map_err(|e| DocumentError::Read(e.to_string())),
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|e| DocumentError::Read(e.to_string()))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| DocumentError::Read(e.to_string()))
        }
        // Legacy .doc files are attempted with the same reader; genuinely old
        // binary documents fail as a read error rather than silently.
        "docx" | "doc" => {
            let bytes = std::fs::read(path).map_err(|e| DocumentError::Read(e.to_string()))?;
            extract_docx_text(&bytes)
        }
        other => Err(DocumentError::Unsupported(format!(".{other}"))),
    }
}

/// Concatenates the text runs of every paragraph, one paragraph per line.
fn extract_docx_text(data: &[u8]) -> Result<String, DocumentError> {
    let docx = docx_rs::read_docx(data).map_err(|e| DocumentError::Read(e.to_string()))?;

    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for paragraph_child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = paragraph_child {
                    for run_child in run.children {
                        if let docx_rs::RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}
