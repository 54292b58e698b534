use std::path::Path;

use anyhow::Context;
use encoding_rs::UTF_8;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::docx::read_docx_paragraphs;

static BLANK_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\u{3000}]*\n").expect("blank line regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Docx,
}

impl SourceKind {
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("docx") => SourceKind::Docx,
            _ => SourceKind::Text,
        }
    }
}

/// Paragraphs of the input document, ready for partitioning.
pub fn read_paragraphs(path: &Path) -> anyhow::Result<Vec<String>> {
    match SourceKind::for_path(path) {
        SourceKind::Docx => read_docx_paragraphs(path),
        SourceKind::Text => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read input: {}", path.display()))?;
            Ok(split_paragraphs(&decode_text(&bytes)))
        }
    }
}

/// UTF-8 unless a BOM says otherwise; invalid sequences become U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _, _) = UTF_8.decode(bytes);
    text.into_owned()
}

/// Blank-line separated paragraphs, trimmed; single newlines inside a
/// paragraph are kept.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    BLANK_LINE_RE
        .split(&text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
