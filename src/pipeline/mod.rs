pub mod chunker;
mod config;
pub mod merge;
pub mod metadata;
pub mod prompts;
pub mod recovery;
mod trace;
mod translator;

pub use config::{init_default_config, CliOverrides, DispatchMode, PipelineConfig};
pub use trace::TraceWriter;
pub use translator::TranslatorPipeline;
