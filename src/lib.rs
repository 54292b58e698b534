pub mod config;
pub mod docx;
pub mod error;
pub mod history;
pub mod ir;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod service;
pub mod source;
pub mod stream;
pub mod textutil;

pub use error::{EngineError, PipelineError};
pub use ir::{Analysis, BilingualName, ParagraphPair, PipelineResult, ProgressEvent};
