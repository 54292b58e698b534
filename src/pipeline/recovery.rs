use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma regex"));
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("fence regex")
});
static BRACE_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span regex"));

/// Which cascade stage produced the object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStage {
    Strict,
    TrailingCommas,
    Lenient,
    Extracted,
    Failed,
}

impl RecoveryStage {
    pub fn label(self) -> &'static str {
        match self {
            RecoveryStage::Strict => "strict",
            RecoveryStage::TrailingCommas => "trailing_commas",
            RecoveryStage::Lenient => "lenient",
            RecoveryStage::Extracted => "extracted",
            RecoveryStage::Failed => "failed",
        }
    }
}

/// Best-effort object recovery from untrusted model text. Never fails; an
/// empty map means every stage gave up.
pub fn recover_object(text: &str) -> Map<String, Value> {
    recover_object_with_stage(text).0
}

pub fn recover_object_with_stage(text: &str) -> (Map<String, Value>, RecoveryStage) {
    if let Some(obj) = parse_strict(text) {
        return (obj, RecoveryStage::Strict);
    }
    let stripped = strip_trailing_commas(text);
    if let Some(obj) = parse_strict(&stripped) {
        return (obj, RecoveryStage::TrailingCommas);
    }
    if let Some(obj) = parse_lenient(text) {
        return (obj, RecoveryStage::Lenient);
    }
    if let Some(obj) = extract_embedded(text).and_then(parse_lenient) {
        return (obj, RecoveryStage::Extracted);
    }
    (Map::new(), RecoveryStage::Failed)
}

pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA_RE.replace_all(text, "$1").into_owned()
}

/// First fenced block, else the greedy first-`{`-to-last-`}` span.
fn extract_embedded(text: &str) -> Option<&str> {
    if let Some(c) = FENCE_RE.captures(text) {
        if let Some(m) = c.get(1) {
            return Some(m.as_str());
        }
    }
    BRACE_SPAN_RE.find(text).map(|m| m.as_str())
}

fn parse_strict(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn parse_lenient(text: &str) -> Option<Map<String, Value>> {
    match json5::from_str::<Value>(text.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}
