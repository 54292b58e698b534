use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ir::PipelineResult;

const ID_HEX_LEN: usize = 16;

/// Identity assigned to a saved run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: PipelineResult,
}

impl HistoryRecord {
    pub fn entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Persistence for completed runs. `id`/`created_at` are generated when not
/// supplied; `list` returns the most recent first.
pub trait HistoryStore: Send + Sync {
    fn save(
        &self,
        result: &PipelineResult,
        id: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<HistoryEntry>;

    fn list(&self) -> anyhow::Result<Vec<HistoryRecord>>;

    /// Returns whether anything was removed.
    fn remove(&self, id: &str) -> anyhow::Result<bool>;
}

pub fn generate_id(result: &PipelineResult, created_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(created_at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    hasher.update([0u8]);
    hasher.update(result.title.en.as_bytes());
    hasher.update([0u8]);
    for p in &result.translation {
        hasher.update(p.source.as_bytes());
        hasher.update([0u8]);
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_HEX_LEN);
    id
}

fn validate_id(id: &str) -> anyhow::Result<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(anyhow!("invalid history id: {id:?}"))
    }
}

fn build_record(
    result: &PipelineResult,
    id: Option<&str>,
    created_at: Option<DateTime<Utc>>,
) -> anyhow::Result<HistoryRecord> {
    let created_at = created_at.unwrap_or_else(Utc::now);
    let id = match id {
        Some(id) => {
            validate_id(id)?;
            id.to_string()
        }
        None => generate_id(result, &created_at),
    };
    Ok(HistoryRecord {
        id,
        created_at,
        result: result.clone(),
    })
}

fn newest_first(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// One pretty-printed `<id>.json` per run.
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_record(path: &Path) -> anyhow::Result<HistoryRecord> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read history: {}", path.display()))?;
        serde_json::from_str(text.trim_start_matches('\u{FEFF}'))
            .with_context(|| format!("parse history: {}", path.display()))
    }
}

impl HistoryStore for JsonHistoryStore {
    fn save(
        &self,
        result: &PipelineResult,
        id: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<HistoryEntry> {
        let record = build_record(result, id, created_at)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create history dir: {}", self.dir.display()))?;
        let path = self.record_path(&record.id);
        let json = serde_json::to_string_pretty(&record).context("serialize history record")?;
        std::fs::write(&path, json)
            .with_context(|| format!("write history: {}", path.display()))?;
        Ok(record.entry())
    }

    fn list(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let rd = std::fs::read_dir(&self.dir)
            .with_context(|| format!("list history: {}", self.dir.display()))?;
        let mut out = Vec::new();
        for ent in rd {
            let path = ent.context("read history entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Foreign or half-written files are skipped.
            if let Ok(rec) = Self::read_record(&path) {
                out.push(rec);
            }
        }
        newest_first(&mut out);
        Ok(out)
    }

    fn remove(&self, id: &str) -> anyhow::Result<bool> {
        validate_id(id)?;
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("remove history: {}", path.display()))?;
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(
        &self,
        result: &PipelineResult,
        id: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<HistoryEntry> {
        let record = build_record(result, id, created_at)?;
        let entry = record.entry();
        let mut guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        guard.retain(|r| r.id != record.id);
        guard.push(record);
        Ok(entry)
    }

    fn list(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        let mut out = guard.clone();
        newest_first(&mut out);
        Ok(out)
    }

    fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        let before = guard.len();
        guard.retain(|r| r.id != id);
        Ok(guard.len() != before)
    }
}
