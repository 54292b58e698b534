use std::path::PathBuf;

use anyhow::Context;

/// Optional on-disk dump of each chunk's prompt and raw reply.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Writes `chunk_<index>.<stage>.<kind>.txt`; stage and kind are scrubbed
    /// of path separators.
    pub fn write_chunk_text(
        &self,
        chunk_index: usize,
        stage: &str,
        kind: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!(
            "chunk_{chunk_index:03}.{}.{}.txt",
            filename_part(stage),
            filename_part(kind)
        );
        let path = self.dir.join(name);
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))
    }
}

fn filename_part(s: &str) -> String {
    s.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => ch,
        })
        .collect()
}
