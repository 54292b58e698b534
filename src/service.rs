use crate::error::PipelineError;
use crate::history::HistoryStore;
use crate::ir::{PipelineResult, ProgressEvent};
use crate::pipeline::{DispatchMode, TranslatorPipeline};
use crate::progress::ConsoleProgress;
use crate::stream::ProgressSink;

/// One complete job: run the pipeline, persist on success, then close the
/// stream with exactly one terminal event. A cancelled run writes nothing
/// further to `sink` and saves nothing.
pub fn run_job(
    pipeline: &TranslatorPipeline,
    history: Option<&dyn HistoryStore>,
    paragraphs: &[String],
    credential: Option<&str>,
    mode: DispatchMode,
    sink: &mut dyn ProgressSink,
    progress: &ConsoleProgress,
) -> Result<PipelineResult, PipelineError> {
    match pipeline.run(paragraphs, credential, mode, sink) {
        Ok(result) => {
            if let Some(store) = history {
                match store.save(&result, None, None) {
                    Ok(entry) => progress.info(format!("Saved to history: {}", entry.id)),
                    Err(e) => progress.warn(format!("history save failed: {e:#}")),
                }
            }
            let done = ProgressEvent::Done {
                result: result.clone(),
            };
            if let Err(e) = sink.emit(&done) {
                progress.warn(format!("could not deliver result: {e:#}"));
            }
            Ok(result)
        }
        Err(PipelineError::Cancelled) => {
            progress.warn("run cancelled by caller");
            Err(PipelineError::Cancelled)
        }
        Err(err) => {
            progress.warn(format!("run failed ({}): {err}", err.kind()));
            let event = ProgressEvent::Error {
                message: err.to_string(),
                kind: err.kind().to_string(),
            };
            if let Err(e) = sink.emit(&event) {
                progress.warn(format!("could not deliver error: {e:#}"));
            }
            Err(err)
        }
    }
}
