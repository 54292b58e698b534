use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::PromptsSection;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_FULL: &str = "full.txt";
pub const DEFAULT_TRANSLATION_ONLY: &str = "translation_only.txt";

/// Templates for the two request variants. `{{paragraph_count}}` and
/// `{{paragraphs_json}}` are substituted per chunk.
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub full: String,
    pub translation_only: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            full: DEFAULT_FULL_TEXT.to_string(),
            translation_only: DEFAULT_TRANSLATION_ONLY_TEXT.to_string(),
        }
    }
}

impl PromptSet {
    /// Overrides named in `[prompts]` are resolved relative to the config file;
    /// anything not named falls back to the built-in template.
    pub fn load(config_path: &Path, p: &PromptsSection) -> anyhow::Result<Self> {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let mut set = Self::default();
        if let Some(rel) = p.full.as_deref() {
            set.full = read_prompt(config_dir, "full", rel)?;
        }
        if let Some(rel) = p.translation_only.as_deref() {
            set.translation_only = read_prompt(config_dir, "translation_only", rel)?;
        }
        Ok(set)
    }

    /// First-chunk request: translation plus title/author and analysis.
    pub fn build_full_prompt(&self, paragraphs: &[String]) -> String {
        render_chunk(&self.full, paragraphs)
    }

    /// Later-chunk request: translation array only.
    pub fn build_translation_only_prompt(&self, paragraphs: &[String]) -> String {
        render_chunk(&self.translation_only, paragraphs)
    }
}

fn render_chunk(template: &str, paragraphs: &[String]) -> String {
    let count = paragraphs.len().to_string();
    let block = serde_json::to_string_pretty(paragraphs).unwrap_or_else(|_| "[]".to_string());
    render_template(
        template,
        &[("paragraph_count", &count), ("paragraphs_json", &block)],
    )
}

fn read_prompt(config_dir: &Path, key: &str, rel: &str) -> anyhow::Result<String> {
    let mut p = PathBuf::from(rel);
    if p.is_relative() {
        p = config_dir.join(&p);
    }
    if !p.exists() {
        return Err(anyhow!(
            "prompt file not found for {key}: {} (run: lit-translator --init-config)",
            p.display()
        ));
    }
    std::fs::read_to_string(&p).with_context(|| format!("read prompt: {}", p.display()))
}

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_FULL, DEFAULT_FULL_TEXT),
        (DEFAULT_TRANSLATION_ONLY, DEFAULT_TRANSLATION_ONLY_TEXT),
    ]
}

pub const DEFAULT_FULL_TEXT: &str = r#"You are a literary translator and critic. Translate the English paragraphs below into Simplified Chinese and analyse the work.

Return STRICT JSON only (one JSON object). No markdown. No extra text.

Schema:
{"title":{"en":"","zh":""},"author":{"en":"","zh":""},"translation":["..."],"analysis":{"summary":"","narrativeDetail":"","themes":["..."],"pros":["..."],"cons":["..."]}}

Rules for "title":
- The first paragraph (or its first line) is the title if it is at most 60 characters long and does not end with sentence punctuation (. ! ?).
- Never use a line that looks like an author line (Author: X, By X, 作者：X) as the title.
- "en" is the original title, "zh" its Chinese translation. Use "" when there is no title.

Rules for "author":
- Look for "Author: <Name>" or "By <Name>" in the English text, or "作者：<Name>" in the Chinese text.
- Strip the label; keep only the name. "en" is the original name, "zh" its Chinese rendering. Use "" when unknown.

Rules for "translation":
- Exactly {{paragraph_count}} strings, one per input paragraph, in the same order.
- Do NOT merge, split, omit or reorder paragraphs; do NOT summarize.

Rules for "analysis" (write in Chinese):
- "summary": at most 60 characters.
- "narrativeDetail": at most 200 characters.
- "themes", "pros", "cons": short items, each at most 40 characters.

PARAGRAPHS ({{paragraph_count}}):
{{paragraphs_json}}"#;

pub const DEFAULT_TRANSLATION_ONLY_TEXT: &str = r#"You are a literary translator. Translate the English paragraphs below into Simplified Chinese.

Return STRICT JSON only (one JSON object). No markdown. No extra text.

Schema:
{"translation":["..."]}

Rules:
- Exactly {{paragraph_count}} strings, one per input paragraph, in the same order.
- Do NOT merge, split, omit or reorder paragraphs; do NOT summarize.

PARAGRAPHS ({{paragraph_count}}):
{{paragraphs_json}}"#;
