//! Uploaded-document resolution: turns PDF, HTML or plain-text bytes into
//! the plain text the oracle consumes.
//!
//! PDF parsing is CPU-bound native code; callers run `resolve_document`
//! under `spawn_blocking` so it never stalls the async runtime.

use std::io::Write;
use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Html,
    Text,
}

impl DocumentKind {
    /// Filename extension wins over the declared content type: mail clients
    /// and browsers routinely ship PDFs as application/octet-stream.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            return DocumentKind::Pdf;
        }
        if lower.ends_with(".html") || lower.ends_with(".htm") {
            return DocumentKind::Html;
        }
        match content_type {
            Some(ct) if ct.starts_with("application/pdf") => DocumentKind::Pdf,
            Some(ct) if ct.starts_with("text/html") => DocumentKind::Html,
            _ => DocumentKind::Text,
        }
    }
}

/// One file field lifted out of the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::detect(&self.filename, self.content_type.as_deref())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Converts an uploaded document to plain text.
/// Empty output is a resolution failure, not an empty record.
pub fn resolve_document(doc: &UploadedDocument) -> Result<String, AppError> {
    let text = match doc.kind() {
        DocumentKind::Pdf => pdf_to_text(doc)?,
        DocumentKind::Html => html_to_text(&String::from_utf8_lossy(&doc.bytes)),
        DocumentKind::Text => String::from_utf8_lossy(&doc.bytes).to_string(),
    };

    if text.trim().is_empty() {
        return Err(AppError::Resolution(format!(
            "no text could be extracted from '{}'",
            doc.filename
        )));
    }
    Ok(text)
}

fn pdf_to_text(doc: &UploadedDocument) -> Result<String, AppError> {
    // pdf-extract reads from a path, so spool the upload to a temp file
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| AppError::Resolution(format!("temp file for '{}': {e}", doc.filename)))?;
    tmp.write_all(&doc.bytes)
        .map_err(|e| AppError::Resolution(format!("spooling '{}': {e}", doc.filename)))?;

    pdf_extract::extract_text(tmp.path())
        .map_err(|e| AppError::Resolution(format!("PDF parse of '{}': {e}", doc.filename)))
}

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Crude tag stripping. Layout fidelity does not matter here; the oracle
/// only needs the visible text.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(html, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; decodes last; anything earlier would double-decode "&amp;lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
