use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{anyhow, Context};
use zip::ZipArchive;

pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Read-only view of a DOCX zip package.
pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        Self::from_reader(f)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> anyhow::Result<Self> {
        let mut zip = ZipArchive::new(reader).context("read zip")?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(Self { entries })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.data.as_slice())
    }

    pub fn main_document(&self) -> anyhow::Result<&[u8]> {
        self.part(MAIN_DOCUMENT_PART)
            .ok_or_else(|| anyhow!("not a word document: missing {MAIN_DOCUMENT_PART}"))
    }
}
