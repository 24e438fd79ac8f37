//! Document text extraction
//!
//! Supported formats: PDF (via `pdf-extract`), DOCX and PPTX (OOXML zip
//! parts), and plain text. Extracted text is always passed through
//! [`clean_document_text`].

pub mod clean;

use lazy_static::lazy_static;
use regex::Regex;
use roxmltree::{Document, Node};
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

pub use clean::clean_document_text;

lazy_static! {
    static ref SLIDE_NAME_RE: Regex = Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex");
}

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DRAWING_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PRESENTATION_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0:?}")]
    UnsupportedType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Invalid office archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed document XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Input formats understood by [`FileExtractor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn detect(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| ExtractError::UnsupportedType(ext.to_string()))
    }
}

/// Turns a document on disk into plain text
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Default extractor for local files
#[derive(Debug, Default, Clone)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Raw text for bytes of a known format, before cleanup
    pub fn extract_raw(format: DocumentFormat, data: &[u8]) -> Result<String, ExtractError> {
        match format {
            DocumentFormat::Txt => Ok(String::from_utf8_lossy(data).into_owned()),
            DocumentFormat::Pdf => {
                pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractError::Pdf(e.to_string()))
            }
            DocumentFormat::Docx => extract_docx(data),
            DocumentFormat::Pptx => extract_pptx(data),
        }
    }
}

impl TextExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let format = DocumentFormat::detect(path)?;
        let data = std::fs::read(path)?;
        let raw = Self::extract_raw(format, &data)?;
        let cleaned = clean_document_text(&raw);

        tracing::debug!(
            "Extracted {} chars ({} after cleanup) from {:?} as {:?}",
            raw.len(),
            cleaned.len(),
            path,
            format
        );
        Ok(cleaned)
    }
}

type OfficeArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn read_part(archive: &mut OfficeArchive<'_>, name: &str) -> Result<String, ExtractError> {
    let mut xml = String::new();
    archive.by_name(name)?.read_to_string(&mut xml)?;
    Ok(xml)
}

fn has_tag(node: &Node, namespace: &str, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(namespace) && node.tag_name().name() == name
}

/// Body-level paragraphs joined by newlines; blank paragraphs are skipped.
/// Tables are not part of the body paragraph list.
fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let xml = read_part(&mut archive, DOCX_BODY)?;
    let doc = Document::parse(&xml)?;

    let paragraphs: Vec<String> = doc
        .descendants()
        .find(|n| has_tag(n, WORD_NS, "body"))
        .map(|body| {
            body.children()
                .filter(|n| has_tag(n, WORD_NS, "p"))
                .map(|p| word_paragraph_text(&p))
                .filter(|text| !text.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(paragraphs.join("\n"))
}

/// Run text with `w:tab` as a tab and line breaks as newlines.
/// Page and column breaks carry no text.
fn word_paragraph_text(paragraph: &Node) -> String {
    let mut text = String::new();
    for run in paragraph.descendants().filter(|n| has_tag(n, WORD_NS, "r")) {
        for child in run.children() {
            if has_tag(&child, WORD_NS, "t") {
                text.push_str(child.text().unwrap_or_default());
            } else if has_tag(&child, WORD_NS, "tab") {
                text.push('\t');
            } else if has_tag(&child, WORD_NS, "cr") {
                text.push('\n');
            } else if has_tag(&child, WORD_NS, "br") {
                let kind = child.attribute((WORD_NS, "type")).unwrap_or("textWrapping");
                if kind == "textWrapping" {
                    text.push('\n');
                }
            }
        }
    }
    text
}

/// Text of every non-blank shape, slide by slide in numeric order
fn extract_pptx(data: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_NAME_RE.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut texts = Vec::new();
    for (_, name) in slides {
        let xml = read_part(&mut archive, &name)?;
        texts.extend(shape_texts(&xml)?);
    }

    Ok(texts.join("\n"))
}

fn shape_texts(slide_xml: &str) -> Result<Vec<String>, ExtractError> {
    let doc = Document::parse(slide_xml)?;
    Ok(doc
        .descendants()
        .filter(|n| has_tag(n, PRESENTATION_NS, "txBody"))
        .map(|body| {
            body.children()
                .filter(|n| has_tag(n, DRAWING_NS, "p"))
                .map(|p| drawing_paragraph_text(&p))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.trim().is_empty())
        .collect())
}

fn drawing_paragraph_text(paragraph: &Node) -> String {
    paragraph
        .children()
        .filter_map(|child| {
            if has_tag(&child, DRAWING_NS, "br") {
                Some("\n")
            } else if has_tag(&child, DRAWING_NS, "r") || has_tag(&child, DRAWING_NS, "fld") {
                child
                    .children()
                    .find(|n| has_tag(n, DRAWING_NS, "t"))
                    .and_then(|t| t.text())
            } else {
                None
            }
        })
        .collect()
}
