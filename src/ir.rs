use serde::{Deserialize, Serialize};

use crate::textutil::is_placeholder_text;

/// One source paragraph aligned with its translation. Identity is the position
/// in the enclosing sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphPair {
    pub source: String,
    pub target: String,
}

impl ParagraphPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn untranslated(source: impl Into<String>) -> Self {
        Self::new(source, String::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualName {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub zh: String,
}

impl BilingualName {
    pub fn new(en: impl Into<String>, zh: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            zh: zh.into(),
        }
    }

    /// Both sides absent (empty or a bare dash run).
    #[must_use]
    pub fn is_absent(&self) -> bool {
        is_placeholder_text(&self.en) && is_placeholder_text(&self.zh)
    }

    /// Blank out dash-only placeholders so they read as absent downstream.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let clean = |s: &str| {
            if is_placeholder_text(s) {
                String::new()
            } else {
                s.trim().to_string()
            }
        };
        Self {
            en: clean(&self.en),
            zh: clean(&self.zh),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub narrative_detail: String,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

/// Terminal artifact of one run; the unit handed to the history store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(default)]
    pub title: BilingualName,
    #[serde(default)]
    pub author: BilingualName,
    #[serde(default)]
    pub translation: Vec<ParagraphPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

/// Streaming progress record. A stream carries any number of `Progress`
/// events followed by exactly one `Done` or `Error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    Progress {
        chunk_index: usize,
        total_chunks: usize,
        percent: u8,
        message: String,
    },
    Done {
        result: PipelineResult,
    },
    Error {
        message: String,
        kind: String,
    },
}

impl ProgressEvent {
    pub fn chunk_finished(chunk_index: usize, total_chunks: usize) -> Self {
        let total = total_chunks.max(1);
        let completed = (chunk_index + 1).min(total);
        ProgressEvent::Progress {
            chunk_index,
            total_chunks,
            percent: percent_of(completed, total),
            message: format!("Translated part {completed}/{total}"),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }
}

pub fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (completed.min(total) as f64 / total as f64) * 100.0;
    pct.round() as u8
}
