//! Text extraction for document files.

mod pdf;
mod text;

pub use pdf::PdfParser;
pub use text::TextParser;

use crate::error::IngestResult;
use std::path::Path;

/// Text pulled out of one document file.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    /// Short format tag, e.g. `pdf`.
    pub format: &'static str,
}

impl ParsedDocument {
    pub fn new(content: impl Into<String>, format: &'static str) -> Self {
        Self {
            content: content.into(),
            format,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument>;

    fn extensions(&self) -> &[&str];

    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// The parsers the document adapter dispatches to, by file extension.
pub struct ParserSet {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserSet {
    pub fn new(parsers: Vec<Box<dyn DocumentParser>>) -> Self {
        Self { parsers }
    }

    pub fn parser_for(&self, path: &Path) -> Option<&dyn DocumentParser> {
        let extension = path.extension().and_then(|e| e.to_str())?;
        self.parsers
            .iter()
            .find(|p| p.supports(extension))
            .map(|p| p.as_ref())
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.parser_for(path).is_some()
    }
}

impl Default for ParserSet {
    /// PDF through text extraction, `.txt` read as-is.
    fn default() -> Self {
        Self::new(vec![Box::new(PdfParser::new()), Box::new(TextParser::new())])
    }
}
