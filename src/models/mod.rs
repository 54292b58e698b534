pub mod remote;

use std::sync::Arc;

use crate::error::EngineError;

pub use remote::{EngineProvider, RemoteEngine, RemoteEngineConfig};

/// Prompt in, reply text out.
pub trait TranslationEngine: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, prompt: &str, credential: &str) -> Result<String, EngineError>;
}

impl<T: TranslationEngine + ?Sized> TranslationEngine for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn call(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        (**self).call(prompt, credential)
    }
}

impl<T: TranslationEngine + ?Sized> TranslationEngine for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn call(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        (**self).call(prompt, credential)
    }
}
