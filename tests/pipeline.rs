use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lit_translator::history::{HistoryEntry, HistoryRecord, HistoryStore, MemoryHistoryStore};
use lit_translator::ir::PipelineResult;
use lit_translator::models::TranslationEngine;
use lit_translator::pipeline::prompts::PromptSet;
use lit_translator::pipeline::{DispatchMode, PipelineConfig, TranslatorPipeline};
use lit_translator::progress::ConsoleProgress;
use lit_translator::service::run_job;
use lit_translator::stream::CollectingSink;
use lit_translator::{EngineError, ParagraphPair, PipelineError, ProgressEvent};

type Responder = dyn Fn(Request) -> Result<String, EngineError> + Send + Sync;

/// What the scripted engine sees of each call.
struct Request {
    full: bool,
    paragraphs: Vec<String>,
}

struct ScriptedEngine {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    fn new(
        respond: impl Fn(Request) -> Result<String, EngineError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TranslationEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn call(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        assert_eq!(credential, "test-key");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (head, body) = prompt.split_once('\n').expect("prompt header");
        let paragraphs: Vec<String> = serde_json::from_str(body).expect("paragraph block");
        (self.respond)(Request {
            full: head == "FULL",
            paragraphs,
        })
    }
}

fn pipeline(engine: &Arc<ScriptedEngine>, chunk_chars: usize) -> TranslatorPipeline {
    let cfg = PipelineConfig {
        chunk_chars,
        prompts: PromptSet {
            full: "FULL\n{{paragraphs_json}}".to_string(),
            translation_only: "REST\n{{paragraphs_json}}".to_string(),
        },
        ..PipelineConfig::default()
    };
    TranslatorPipeline::new(Box::new(engine.clone()), &cfg, ConsoleProgress::silent())
}

fn echo_translation(paragraphs: &[String]) -> String {
    let items: Vec<String> = paragraphs.iter().map(|p| format!("译:{p}")).collect();
    serde_json::json!({ "translation": items }).to_string()
}

fn numbered(n: usize, len: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let head = format!("p{i:02} ");
            format!("{head}{}", "x".repeat(len - head.len()))
        })
        .collect()
}

/// Store whose writes always fail.
struct FailingStore;

impl HistoryStore for FailingStore {
    fn save(
        &self,
        _result: &PipelineResult,
        _id: Option<&str>,
        _created_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<HistoryEntry> {
        Err(anyhow::anyhow!("disk full"))
    }

    fn list(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        Ok(Vec::new())
    }

    fn remove(&self, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

fn kinds(events: &[ProgressEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Done { .. } => "done",
            ProgressEvent::Error { .. } => "error",
        })
        .collect()
}

#[test]
fn empty_metadata_falls_back_to_leading_paragraphs() {
    let engine = ScriptedEngine::new(|req| {
        assert!(req.full);
        Ok(serde_json::json!({
            "title": {"en": "", "zh": "—"},
            "author": {"en": "-", "zh": ""},
            "translation": ["东京杂草", "阿莫斯·李 著", "雨已经下了三天。"],
            "analysis": {
                "summary": "雨中的东京。",
                "narrativeDetail": "叙述者在新宿等雨停。",
                "themes": ["孤独"],
                "pros": ["氛围"],
                "cons": []
            }
        })
        .to_string())
    });
    let p = pipeline(&engine, 5500);
    let store = MemoryHistoryStore::new();
    let mut sink = CollectingSink::default();
    let input: Vec<String> = ["TOKYO WEEDS", "By Amos Lee", "The rain had not stopped for three days."]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let result = run_job(
        &p,
        Some(&store),
        &input,
        Some("test-key"),
        DispatchMode::Batch,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect("run");

    assert_eq!(result.title.en, "TOKYO WEEDS");
    assert_eq!(result.title.zh, "东京杂草");
    assert_eq!(result.author.en, "Amos Lee");
    assert_eq!(result.translation.len(), 3);
    assert_eq!(
        result.analysis.as_ref().map(|a| a.narrative_detail.as_str()),
        Some("叙述者在新宿等雨停。")
    );
    assert_eq!(engine.calls(), 1);

    assert_eq!(kinds(&sink.events), vec!["done"]);
    let saved = store.list().expect("list");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].result, result);
}

#[test]
fn history_write_failure_still_delivers_result() {
    let engine = ScriptedEngine::new(|req| Ok(echo_translation(&req.paragraphs)));
    let p = pipeline(&engine, 5500);
    let mut sink = CollectingSink::default();
    let input = numbered(3, 20);

    let result = run_job(
        &p,
        Some(&FailingStore),
        &input,
        Some("test-key"),
        DispatchMode::Batch,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect("save failure is not a run failure");

    assert_eq!(result.translation.len(), 3);
    assert_eq!(result.translation[2].target, format!("译:{}", input[2]));
    assert_eq!(kinds(&sink.events), vec!["done"]);
}

#[test]
fn batch_output_follows_input_order_under_reversed_completion() {
    let input = numbered(12, 1000);
    let first_of_last_chunk = input[10].clone();
    let engine = ScriptedEngine::new(move |req| {
        // The middle chunk finishes after the last one.
        if !req.full && req.paragraphs[0] != first_of_last_chunk {
            std::thread::sleep(Duration::from_millis(150));
        }
        Ok(echo_translation(&req.paragraphs))
    });
    let p = pipeline(&engine, 5500);

    let result = p
        .run(&input, Some("test-key"), DispatchMode::Batch, &mut CollectingSink::default())
        .expect("run");

    assert_eq!(engine.calls(), 3);
    let expected: Vec<ParagraphPair> = input
        .iter()
        .map(|s| ParagraphPair::new(s.clone(), format!("译:{s}")))
        .collect();
    assert_eq!(result.translation, expected);
}

#[test]
fn batch_and_streaming_produce_the_same_result() {
    let input = numbered(7, 30);
    let engine = ScriptedEngine::new(|req| Ok(echo_translation(&req.paragraphs)));
    let p = pipeline(&engine, 70);

    let batch = p
        .run(&input, Some("test-key"), DispatchMode::Batch, &mut CollectingSink::default())
        .expect("batch");
    let mut sink = CollectingSink::default();
    let streamed = p
        .run(&input, Some("test-key"), DispatchMode::Streaming, &mut sink)
        .expect("stream");

    assert_eq!(batch, streamed);
    let percents: Vec<u8> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![25, 50, 75, 100]);
}

#[test]
fn fenced_reply_with_trailing_comma_is_recovered() {
    let engine = ScriptedEngine::new(|_| Ok("```json\n{\"translation\": [\"甲\",\"乙\"],}\n```".into()));
    let p = pipeline(&engine, 5500);
    let input = vec!["First.".to_string(), "Second.".to_string()];
    let result = p
        .run(&input, Some("test-key"), DispatchMode::Batch, &mut CollectingSink::default())
        .expect("run");
    assert_eq!(result.translation[0], ParagraphPair::new("First.", "甲"));
    assert_eq!(result.translation[1], ParagraphPair::new("Second.", "乙"));
}

#[test]
fn first_chunk_without_translation_fails_and_saves_nothing() {
    let engine = ScriptedEngine::new(|req| {
        if req.full {
            Ok(r#"{"title": {"en": "Lost", "zh": "迷失"}}"#.into())
        } else {
            Ok(echo_translation(&req.paragraphs))
        }
    });
    let p = pipeline(&engine, 30);
    let store = MemoryHistoryStore::new();
    let mut sink = CollectingSink::default();

    let err = run_job(
        &p,
        Some(&store),
        &numbered(4, 30),
        Some("test-key"),
        DispatchMode::Streaming,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect_err("must fail");

    assert!(matches!(err, PipelineError::MalformedResponse));
    assert_eq!(err.to_string(), "malformed model response");
    assert_eq!(engine.calls(), 1);
    assert!(store.is_empty());
    match sink.events.as_slice() {
        [ProgressEvent::Error { kind, .. }] => assert_eq!(kind, "malformed_response"),
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn failed_later_chunk_leaves_targets_empty() {
    let input = numbered(4, 30);
    let engine = ScriptedEngine::new(|req| {
        if req.full {
            let items: Vec<String> = req.paragraphs.iter().map(|p| format!("译:{p}")).collect();
            Ok(serde_json::json!({
                "title": {"en": "Rain", "zh": "雨"},
                "author": {"en": "Amos Lee", "zh": "阿莫斯·李"},
                "translation": items,
                "analysis": {"summary": "短篇。"}
            })
            .to_string())
        } else {
            Err(EngineError::Service("request timed out".into()))
        }
    });
    let p = pipeline(&engine, 60);

    for mode in [DispatchMode::Batch, DispatchMode::Streaming] {
        let store = MemoryHistoryStore::new();
        let mut sink = CollectingSink::default();
        let result = run_job(
            &p,
            Some(&store),
            &input,
            Some("test-key"),
            mode,
            &mut sink,
            &ConsoleProgress::silent(),
        )
        .expect("degraded run completes");

        assert_eq!(result.translation.len(), 4);
        assert_eq!(result.translation[0].target, format!("译:{}", input[0]));
        assert_eq!(result.translation[1].target, format!("译:{}", input[1]));
        assert_eq!(result.translation[2], ParagraphPair::untranslated(input[2].clone()));
        assert_eq!(result.translation[3], ParagraphPair::untranslated(input[3].clone()));
        assert_eq!(result.title.en, "Rain");
        assert_eq!(result.author.zh, "阿莫斯·李");
        assert_eq!(result.analysis.as_ref().map(|a| a.summary.as_str()), Some("短篇。"));
        assert_eq!(store.len(), 1);

        let expected = match mode {
            DispatchMode::Batch => vec!["done"],
            DispatchMode::Streaming => vec!["progress", "progress", "done"],
        };
        assert_eq!(kinds(&sink.events), expected);
    }
}

#[test]
fn auth_failure_on_later_chunk_is_fatal() {
    let engine = ScriptedEngine::new(|req| {
        if req.full {
            Ok(echo_translation(&req.paragraphs))
        } else {
            Err(EngineError::Auth("status 401".into()))
        }
    });
    let p = pipeline(&engine, 30);
    let store = MemoryHistoryStore::new();
    let mut sink = CollectingSink::default();
    let err = run_job(
        &p,
        Some(&store),
        &numbered(2, 30),
        Some("test-key"),
        DispatchMode::Streaming,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect_err("auth is fatal");
    assert_eq!(err.kind(), "auth");
    assert!(!err.is_transient());
    assert!(store.is_empty());
    assert_eq!(kinds(&sink.events), vec!["progress", "error"]);
}

#[test]
fn preconditions_fail_before_any_call() {
    let engine = ScriptedEngine::new(|req| Ok(echo_translation(&req.paragraphs)));
    let p = pipeline(&engine, 5500);
    let store = MemoryHistoryStore::new();

    let mut sink = CollectingSink::default();
    let err = run_job(
        &p,
        Some(&store),
        &[],
        Some("test-key"),
        DispatchMode::Batch,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect_err("empty");
    assert_eq!(err.kind(), "empty_input");
    assert_eq!(kinds(&sink.events), vec!["error"]);

    let mut sink = CollectingSink::default();
    let err = run_job(
        &p,
        Some(&store),
        &numbered(1, 10),
        None,
        DispatchMode::Streaming,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect_err("no key");
    assert_eq!(err.kind(), "missing_credential");
    assert_eq!(kinds(&sink.events), vec!["error"]);

    assert_eq!(engine.calls(), 0);
    assert!(store.is_empty());
}

#[test]
fn cancelled_stream_gets_no_terminal_event() {
    let engine = ScriptedEngine::new(|req| Ok(echo_translation(&req.paragraphs)));
    let p = pipeline(&engine, 30);
    let store = MemoryHistoryStore::new();
    let mut sink = CollectingSink::failing_after(2);

    let err = run_job(
        &p,
        Some(&store),
        &numbered(5, 30),
        Some("test-key"),
        DispatchMode::Streaming,
        &mut sink,
        &ConsoleProgress::silent(),
    )
    .expect_err("cancelled");

    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(engine.calls(), 3);
    assert_eq!(kinds(&sink.events), vec!["progress", "progress"]);
    assert!(store.is_empty());
}
