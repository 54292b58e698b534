use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::ir::{Analysis, BilingualName, ParagraphPair};
use crate::textutil::{char_len, contains_cjk, first_non_empty_line, is_placeholder_text};

pub const TITLE_MAX_CHARS: usize = 60;
pub const AUTHOR_SCAN_PAIRS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lang {
    En,
    Zh,
}

/// One author heuristic. Rules are tried in table order within a language;
/// lower `priority` runs first.
pub struct AuthorRule {
    pub name: &'static str,
    pub lang: Lang,
    pub priority: u8,
    pub pattern: &'static Lazy<Regex>,
}

static ZH_AUTHOR_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*作者\s*[:：]\s*(\S.*?)\s*$").expect("zh author label"));
static ZH_AUTHOR_LOOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*作者\s*[:：]?\s*(\S.*?)\s*$").expect("zh author loose"));
static EN_AUTHOR_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*author\s*[:：]\s*(\S.*?)\s*$").expect("en author label"));
static EN_AUTHOR_BY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*[Bb][Yy]\s+(\p{Lu}[\p{L}.'’-]*(?:\s+\p{Lu}[\p{L}.'’-]*)*)\s*$")
        .expect("en author by")
});

pub static AUTHOR_RULES: &[AuthorRule] = &[
    AuthorRule {
        name: "zh_label",
        lang: Lang::Zh,
        priority: 0,
        pattern: &ZH_AUTHOR_LABEL_RE,
    },
    AuthorRule {
        name: "zh_loose",
        lang: Lang::Zh,
        priority: 1,
        pattern: &ZH_AUTHOR_LOOSE_RE,
    },
    AuthorRule {
        name: "en_label",
        lang: Lang::En,
        priority: 0,
        pattern: &EN_AUTHOR_LABEL_RE,
    },
    AuthorRule {
        name: "en_by",
        lang: Lang::En,
        priority: 1,
        pattern: &EN_AUTHOR_BY_RE,
    },
];

static AUTHOR_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:author\s*[:：]|by\s+\w|作者\s*[:：])").expect("author line")
});

impl AuthorRule {
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let name = caps.get(1)?.as_str().trim();
        if is_placeholder_text(name) {
            None
        } else {
            Some(name.to_string())
        }
    }
}

fn rules_for(lang: Lang) -> Vec<&'static AuthorRule> {
    let mut rules: Vec<&AuthorRule> = AUTHOR_RULES.iter().filter(|r| r.lang == lang).collect();
    rules.sort_by_key(|r| r.priority);
    rules
}

fn match_author(text: &str, lang: Lang) -> Option<String> {
    rules_for(lang).into_iter().find_map(|r| r.apply(text))
}

pub fn looks_like_author_line(line: &str) -> bool {
    AUTHOR_LINE_RE.is_match(line)
}

fn title_candidate(text: &str, terminals: &[char]) -> Option<String> {
    let line = first_non_empty_line(text)?;
    if char_len(line) > TITLE_MAX_CHARS {
        return None;
    }
    if line.ends_with(terminals) {
        return None;
    }
    if looks_like_author_line(line) {
        return None;
    }
    Some(line.to_string())
}

pub fn extract_title(pairs: &[ParagraphPair]) -> BilingualName {
    let Some(first) = pairs.first() else {
        return BilingualName::default();
    };
    BilingualName {
        en: title_candidate(&first.source, &['.', '!', '?']).unwrap_or_default(),
        zh: title_candidate(&first.target, &['。', '！', '？']).unwrap_or_default(),
    }
}

/// Author guess from the first few pairs; stops at the first pair that
/// yields a name in either language.
pub fn extract_author(pairs: &[ParagraphPair]) -> BilingualName {
    for pair in pairs.iter().take(AUTHOR_SCAN_PAIRS) {
        let en = match_author(&pair.source, Lang::En).unwrap_or_default();
        let zh = match_author(&pair.target, Lang::Zh).unwrap_or_default();
        if !en.is_empty() || !zh.is_empty() {
            return BilingualName { en, zh };
        }
    }
    BilingualName::default()
}

/// Fill each absent side of `primary` from `fallback`; present values win.
fn backfill(primary: &BilingualName, fallback: impl FnOnce() -> BilingualName) -> BilingualName {
    let primary = primary.normalized();
    if !primary.en.is_empty() && !primary.zh.is_empty() {
        return primary;
    }
    let guess = fallback();
    BilingualName {
        en: if primary.en.is_empty() { guess.en } else { primary.en },
        zh: if primary.zh.is_empty() { guess.zh } else { primary.zh },
    }
}

pub fn apply_fallbacks(
    title: &BilingualName,
    author: &BilingualName,
    translation: &[ParagraphPair],
) -> (BilingualName, BilingualName) {
    (
        backfill(title, || extract_title(translation)),
        backfill(author, || extract_author(translation)),
    )
}

/// `title`/`author` as supplied by the engine: an `{en, zh}` object, or a bare
/// string assigned by script.
pub fn name_field(obj: &Map<String, Value>, key: &str) -> BilingualName {
    let name = match obj.get(key) {
        Some(Value::Object(o)) => BilingualName {
            en: str_field(o, &["en", "english", "original"]),
            zh: str_field(o, &["zh", "chinese", "translation"]),
        },
        Some(Value::String(s)) if contains_cjk(s) => BilingualName::new("", s.trim()),
        Some(Value::String(s)) => BilingualName::new(s.trim(), ""),
        _ => BilingualName::default(),
    };
    name.normalized()
}

pub fn analysis_field(obj: &Map<String, Value>) -> Option<Analysis> {
    let a = obj.get("analysis")?.as_object()?;
    Some(Analysis {
        summary: str_field(a, &["summary"]),
        narrative_detail: str_field(a, &["narrativeDetail", "narrative_detail", "narrative"]),
        themes: list_field(a, "themes"),
        pros: list_field(a, "pros"),
        cons: list_field(a, "cons"),
    })
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
