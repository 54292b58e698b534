use thiserror::Error;

/// Failure of a single remote engine call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("API key rejected: {0}")]
    Auth(String),
    #[error("rate limited by translation service: {0}")]
    RateLimited(String),
    #[error("translation service error: {0}")]
    Service(String),
}

impl EngineError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("status {status}: {}", crate::textutil::clip_for_log(body, 300));
        match status {
            401 | 403 => EngineError::Auth(detail),
            429 => EngineError::RateLimited(detail),
            400 if mentions_invalid_key(body) => EngineError::Auth(detail),
            _ => EngineError::Service(detail),
        }
    }
}

fn mentions_invalid_key(body: &str) -> bool {
    body.contains("API_KEY_INVALID") || body.contains("API key not valid")
}

/// Why a run ended without a result. `kind()` is the stable category
/// reported to callers alongside the human-readable message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no paragraphs to translate")]
    EmptyInput,
    #[error("missing API key")]
    MissingCredential,
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("malformed model response")]
    MalformedResponse,
    #[error("run cancelled by caller")]
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EmptyInput => "empty_input",
            PipelineError::MissingCredential => "missing_credential",
            PipelineError::Engine(EngineError::Auth(_)) => "auth",
            PipelineError::Engine(EngineError::RateLimited(_)) => "rate_limited",
            PipelineError::Engine(EngineError::Service(_)) => "service",
            PipelineError::MalformedResponse => "malformed_response",
            PipelineError::Cancelled => "cancelled",
        }
    }

    /// A caller may reasonably retry the whole run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Engine(EngineError::RateLimited(_))
                | PipelineError::Engine(EngineError::Service(_))
        )
    }
}
