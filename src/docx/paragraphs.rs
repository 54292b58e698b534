use std::path::Path;

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::package::DocxPackage;

/// Body paragraphs of a DOCX file in document order, trimmed, empties dropped.
pub fn read_docx_paragraphs(path: &Path) -> anyhow::Result<Vec<String>> {
    let pkg = DocxPackage::read(path)?;
    paragraphs_from_package(&pkg)
}

pub fn paragraphs_from_package(pkg: &DocxPackage) -> anyhow::Result<Vec<String>> {
    let xml = pkg.main_document()?;
    paragraphs_from_document_xml(xml)
}

/// `w:t` runs joined per `w:p`; `w:tab` becomes a tab and `w:br`/`w:cr` a
/// line break. Paragraphs nested in text boxes are emitted on their own.
pub fn paragraphs_from_document_xml(xml: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out: Vec<String> = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader.read_event_into(&mut buf).context("read xml event")?;
        match ev {
            Event::Eof => break,
            Event::Start(s) => match s.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(p) = open.pop() {
                        let p = p.trim();
                        if !p.is_empty() {
                            out.push(p.to_string());
                        }
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(s) => {
                if let Some(cur) = open.last_mut() {
                    match s.name().as_ref() {
                        b"w:tab" => cur.push('\t'),
                        b"w:br" | b"w:cr" => cur.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(t) if in_text => {
                if let Some(cur) = open.last_mut() {
                    let txt = t.unescape().context("unescape text")?;
                    cur.push_str(&txt);
                }
            }
            _ => {}
        }
    }
    Ok(out)
}
