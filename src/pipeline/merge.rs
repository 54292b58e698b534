use serde_json::{Map, Value};

use crate::ir::ParagraphPair;

const TARGET_KEYS: &[&str] = &["zh", "target", "translation", "translated", "text"];
const SOURCE_KEYS: &[&str] = &["en", "source", "original"];

/// Shape of one element of a recovered `translation` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranslationElement {
    PlainText(String),
    TargetOnly(String),
    SourceAndTarget { source: String, target: String },
    Malformed,
}

impl TranslationElement {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::String(s) => TranslationElement::PlainText(s.clone()),
            Value::Object(obj) => {
                let target = first_string(obj, TARGET_KEYS);
                match (first_string(obj, SOURCE_KEYS), target) {
                    (Some(source), target) => TranslationElement::SourceAndTarget {
                        source,
                        target: target.unwrap_or_default(),
                    },
                    (None, Some(target)) => TranslationElement::TargetOnly(target),
                    (None, None) => TranslationElement::Malformed,
                }
            }
            _ => TranslationElement::Malformed,
        }
    }

    fn into_pair(self, original: &str) -> ParagraphPair {
        match self {
            TranslationElement::PlainText(t) | TranslationElement::TargetOnly(t) => {
                ParagraphPair::new(original, t.trim())
            }
            TranslationElement::SourceAndTarget { source, target } => {
                let source = source.trim();
                let source = if source.is_empty() { original } else { source };
                ParagraphPair::new(source, target.trim())
            }
            TranslationElement::Malformed => ParagraphPair::untranslated(original),
        }
    }
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// The recovered `translation` field as an array, if it is one.
pub fn translation_array(obj: &Map<String, Value>) -> Option<&Vec<Value>> {
    obj.get("translation").and_then(Value::as_array)
}

/// Align recovered elements to the chunk's paragraphs by position. The output
/// always has exactly `paragraphs.len()` pairs, however far the recovered
/// array drifts.
pub fn merge_chunk(paragraphs: &[String], recovered: Option<&Value>) -> Vec<ParagraphPair> {
    let items: &[Value] = match recovered {
        Some(Value::Array(items)) => items,
        _ => &[],
    };
    paragraphs
        .iter()
        .enumerate()
        .map(|(i, original)| {
            items
                .get(i)
                .map(TranslationElement::classify)
                .unwrap_or(TranslationElement::Malformed)
                .into_pair(original)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paras(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("para {i}")).collect()
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(
            TranslationElement::classify(&json!("你好")),
            TranslationElement::PlainText("你好".into())
        );
        assert_eq!(
            TranslationElement::classify(&json!({"zh": "你好"})),
            TranslationElement::TargetOnly("你好".into())
        );
        assert_eq!(
            TranslationElement::classify(&json!({"en": "hi", "zh": "你好"})),
            TranslationElement::SourceAndTarget {
                source: "hi".into(),
                target: "你好".into()
            }
        );
        assert_eq!(
            TranslationElement::classify(&json!({"source": "hi"})),
            TranslationElement::SourceAndTarget {
                source: "hi".into(),
                target: String::new()
            }
        );
        assert_eq!(TranslationElement::classify(&json!(7)), TranslationElement::Malformed);
        assert_eq!(TranslationElement::classify(&json!(null)), TranslationElement::Malformed);
        assert_eq!(TranslationElement::classify(&json!({"note": 1})), TranslationElement::Malformed);
    }

    #[test]
    fn mixed_elements_merge_by_position() {
        let p = paras(4);
        let rec = json!(["一", {"zh": "二"}, {"en": "para one (fixed)", "zh": "三"}, 42]);
        let out = merge_chunk(&p, Some(&rec));
        assert_eq!(out[0], ParagraphPair::new("para 0", "一"));
        assert_eq!(out[1], ParagraphPair::new("para 1", "二"));
        assert_eq!(out[2], ParagraphPair::new("para one (fixed)", "三"));
        assert_eq!(out[3], ParagraphPair::untranslated("para 3"));
    }

    #[test]
    fn empty_recovered_source_keeps_original() {
        let p = paras(1);
        let out = merge_chunk(&p, Some(&json!([{"en": "  ", "zh": "零"}])));
        assert_eq!(out[0], ParagraphPair::new("para 0", "零"));
    }

    #[test]
    fn length_never_changes() {
        let shapes = vec![
            None,
            Some(json!(null)),
            Some(json!("not an array")),
            Some(json!({"0": "x"})),
            Some(json!([])),
            Some(json!(["a"])),
            Some(json!(["a", "b", "c", "d", "e", "f", "g", "h"])),
            Some(json!([null, {}, [], 1.5, true])),
        ];
        for n in [1usize, 3, 5] {
            let p = paras(n);
            for s in &shapes {
                let out = merge_chunk(&p, s.as_ref());
                assert_eq!(out.len(), n);
                for (i, pair) in out.iter().enumerate() {
                    assert!(!pair.source.is_empty(), "source lost at {i}");
                }
            }
        }
    }

    #[test]
    fn short_array_pads_with_untranslated() {
        let p = paras(3);
        let out = merge_chunk(&p, Some(&json!(["甲"])));
        assert_eq!(out[0].target, "甲");
        assert_eq!(out[1], ParagraphPair::untranslated("para 1"));
        assert_eq!(out[2], ParagraphPair::untranslated("para 2"));
    }

    #[test]
    fn translation_array_requires_array() {
        let m = match json!({"translation": "x"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        assert!(translation_array(&m).is_none());
        let m = match json!({"translation": []}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        assert!(translation_array(&m).is_some());
    }
}
