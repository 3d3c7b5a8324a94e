//! PDF document parser.

use super::{DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;
use tracing::debug;

pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        debug!("Parsing PDF: {:?}", path);

        let raw = pdf_extract::extract_text(path).map_err(|e| IngestError::ParseError {
            path: path.to_path_buf(),
            message: format!("Failed to extract text from PDF: {}", e),
        })?;

        // Scanned PDFs come back empty or as bare page breaks
        let content = clean_pdf_text(&raw);
        debug!("Extracted {} characters from PDF", content.len());

        Ok(ParsedDocument::new(content, "pdf"))
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Trim lines, collapse blank runs, and turn form feeds into paragraph breaks.
fn clean_pdf_text(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.split(['\n', '\x0C']).map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pdf_text() {
        let messy = "  Hello  \n\n\n\nWorld  \x0C\x0CTest\n";
        assert_eq!(clean_pdf_text(messy), "Hello\n\nWorld\n\nTest");
    }

    #[test]
    fn test_blank_pages_clean_to_empty() {
        assert_eq!(clean_pdf_text("\x0C \x0C\n\n"), "");
    }

    #[test]
    fn test_missing_file() {
        let err = PdfParser::new().parse(Path::new("/nonexistent/file.pdf")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }
}
