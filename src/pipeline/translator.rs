use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde_json::{Map, Value};

use crate::error::{EngineError, PipelineError};
use crate::ir::{Analysis, BilingualName, ParagraphPair, PipelineResult, ProgressEvent};
use crate::models::TranslationEngine;
use crate::progress::ConsoleProgress;
use crate::stream::ProgressSink;
use crate::textutil::clip_for_log;

use super::chunker::{partition_paragraphs, Chunk};
use super::config::{DispatchMode, PipelineConfig};
use super::merge::{merge_chunk, translation_array};
use super::metadata::{analysis_field, apply_fallbacks, name_field};
use super::prompts::PromptSet;
use super::recovery::{recover_object_with_stage, RecoveryStage};
use super::trace::TraceWriter;

/// Chunked translation run over one document. Holds no state between runs;
/// the same pipeline may serve any number of `run` calls.
pub struct TranslatorPipeline {
    engine: Box<dyn TranslationEngine>,
    prompts: PromptSet,
    chunk_chars: usize,
    tolerate_chunk_errors: bool,
    log_max_chars: usize,
    progress: ConsoleProgress,
    trace: TraceWriter,
}

/// What the first chunk contributes beyond its paragraphs.
struct Lead {
    title: BilingualName,
    author: BilingualName,
    analysis: Option<Analysis>,
    pairs: Vec<ParagraphPair>,
}

impl TranslatorPipeline {
    pub fn new(
        engine: Box<dyn TranslationEngine>,
        cfg: &PipelineConfig,
        progress: ConsoleProgress,
    ) -> Self {
        let trace = match TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_prompts) {
            Ok(t) => t,
            Err(e) => {
                progress.warn(format!("trace disabled: {e:#}"));
                TraceWriter::disabled()
            }
        };
        Self {
            engine,
            prompts: cfg.prompts.clone(),
            chunk_chars: cfg.chunk_chars.max(1),
            tolerate_chunk_errors: cfg.tolerate_chunk_errors,
            log_max_chars: cfg.log_max_chars,
            progress,
            trace,
        }
    }

    /// Terminal `Done`/`Error` events are left to the caller; a failing sink
    /// ends the run as `Cancelled`.
    pub fn run(
        &self,
        paragraphs: &[String],
        credential: Option<&str>,
        mode: DispatchMode,
        sink: &mut dyn ProgressSink,
    ) -> Result<PipelineResult, PipelineError> {
        if paragraphs.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let credential = credential
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PipelineError::MissingCredential)?;

        let chunks = partition_paragraphs(paragraphs, self.chunk_chars);
        let total = chunks.len();
        self.progress.info(format!(
            "Paragraphs: {}, chunks: {total} (<= {} chars), engine: {}",
            paragraphs.len(),
            self.chunk_chars,
            self.engine.name()
        ));

        let Some((first, rest)) = chunks.split_first() else {
            return Err(PipelineError::EmptyInput);
        };

        let lead = self.translate_first_chunk(first, credential)?;
        self.progress.progress("Translate", 1, total);

        let rest_pairs = match mode {
            DispatchMode::Batch => self.dispatch_batch(rest, credential, total)?,
            DispatchMode::Streaming => {
                emit(sink, ProgressEvent::chunk_finished(first.index, total))?;
                self.dispatch_streaming(rest, credential, total, sink)?
            }
        };

        let mut translation = lead.pairs;
        for pairs in rest_pairs {
            translation.extend(pairs);
        }
        debug_assert_eq!(translation.len(), paragraphs.len());

        let (title, author) = apply_fallbacks(&lead.title, &lead.author, &translation);
        if title.is_absent() {
            self.progress.warn("no title found");
        }
        Ok(PipelineResult {
            title,
            author,
            translation,
            analysis: lead.analysis,
        })
    }

    fn translate_first_chunk(
        &self,
        chunk: &Chunk,
        credential: &str,
    ) -> Result<Lead, PipelineError> {
        let prompt = self.prompts.build_full_prompt(&chunk.paragraphs);
        let obj = self.call_and_recover(chunk, "full", &prompt, credential)?;
        if translation_array(&obj).is_none() {
            self.progress.warn(format!(
                "chunk {}: reply has no translation array",
                chunk.index
            ));
            return Err(PipelineError::MalformedResponse);
        }
        let pairs = merge_chunk(&chunk.paragraphs, obj.get("translation"));
        Ok(Lead {
            title: name_field(&obj, "title"),
            author: name_field(&obj, "author"),
            analysis: analysis_field(&obj),
            pairs,
        })
    }

    fn translate_rest_chunk(
        &self,
        chunk: &Chunk,
        credential: &str,
    ) -> Result<Vec<ParagraphPair>, PipelineError> {
        let prompt = self.prompts.build_translation_only_prompt(&chunk.paragraphs);
        match self.call_and_recover(chunk, "translate", &prompt, credential) {
            Ok(obj) => {
                if translation_array(&obj).is_none() {
                    self.progress.warn(format!(
                        "chunk {}: no usable translation, keeping {} paragraphs untranslated",
                        chunk.index,
                        chunk.paragraphs.len()
                    ));
                }
                Ok(merge_chunk(&chunk.paragraphs, obj.get("translation")))
            }
            Err(PipelineError::Engine(e)) if self.degrades(&e) => {
                self.progress.warn(format!(
                    "chunk {}: {e}; keeping {} paragraphs untranslated",
                    chunk.index,
                    chunk.paragraphs.len()
                ));
                Ok(merge_chunk(&chunk.paragraphs, None))
            }
            Err(e) => Err(e),
        }
    }

    fn degrades(&self, e: &EngineError) -> bool {
        self.tolerate_chunk_errors && !matches!(e, EngineError::Auth(_))
    }

    fn call_and_recover(
        &self,
        chunk: &Chunk,
        stage: &str,
        prompt: &str,
        credential: &str,
    ) -> Result<Map<String, Value>, PipelineError> {
        self.write_trace(chunk.index, stage, "prompt", prompt);
        let raw = self.engine.call(prompt, credential)?;
        self.write_trace(chunk.index, stage, "output.raw", &raw);

        let (obj, recovered) = recover_object_with_stage(&raw);
        match recovered {
            RecoveryStage::Strict => {}
            RecoveryStage::Failed => self.progress.warn(format!(
                "chunk {}: unparseable reply: {}",
                chunk.index,
                clip_for_log(&raw, self.log_max_chars)
            )),
            other => self.progress.info(format!(
                "chunk {}: reply recovered ({})",
                chunk.index,
                other.label()
            )),
        }
        Ok(obj)
    }

    fn dispatch_batch(
        &self,
        rest: &[Chunk],
        credential: &str,
        total: usize,
    ) -> Result<Vec<Vec<ParagraphPair>>, PipelineError> {
        if rest.is_empty() {
            return Ok(Vec::new());
        }
        let done = AtomicUsize::new(1);
        rest.par_iter()
            .map(|chunk| -> Result<Vec<ParagraphPair>, PipelineError> {
                let pairs = self.translate_rest_chunk(chunk, credential)?;
                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                self.progress.progress("Translate", n, total);
                Ok(pairs)
            })
            .collect()
    }

    fn dispatch_streaming(
        &self,
        rest: &[Chunk],
        credential: &str,
        total: usize,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<Vec<ParagraphPair>>, PipelineError> {
        let mut out = Vec::with_capacity(rest.len());
        for chunk in rest {
            out.push(self.translate_rest_chunk(chunk, credential)?);
            self.progress.progress("Translate", chunk.index + 1, total);
            emit(sink, ProgressEvent::chunk_finished(chunk.index, total))?;
        }
        Ok(out)
    }

    fn write_trace(&self, chunk_index: usize, stage: &str, kind: &str, text: &str) {
        if let Err(e) = self.trace.write_chunk_text(chunk_index, stage, kind, text) {
            self.progress.warn(format!("trace write failed: {e:#}"));
        }
    }
}

fn emit(sink: &mut dyn ProgressSink, event: ProgressEvent) -> Result<(), PipelineError> {
    sink.emit(&event).map_err(|_| PipelineError::Cancelled)
}
