use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::EngineError;

use super::TranslationEngine;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineProvider {
    Gemini,
    OpenAiCompatible,
}

impl EngineProvider {
    pub fn parse(s: Option<&str>) -> anyhow::Result<Self> {
        match s.unwrap_or("gemini").trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai_compatible" | "openai-compatible" => Ok(Self::OpenAiCompatible),
            other => Err(anyhow::anyhow!("unknown engine provider: {other}")),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngineProvider::Gemini => "gemini",
            EngineProvider::OpenAiCompatible => "openai-compatible",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            EngineProvider::Gemini => DEFAULT_GEMINI_MODEL,
            EngineProvider::OpenAiCompatible => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn default_key_env(self) -> &'static str {
        match self {
            EngineProvider::Gemini => "GEMINI_API_KEY",
            EngineProvider::OpenAiCompatible => "OPENAI_API_KEY",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RemoteEngineConfig {
    pub provider: EngineProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

pub struct RemoteEngine {
    cfg: RemoteEngineConfig,
    label: String,
    client: Client,
}

impl RemoteEngine {
    pub fn new(cfg: RemoteEngineConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        let label = format!("{}:{}", cfg.provider.label(), cfg.model);
        Ok(Self { cfg, label, client })
    }

    fn base_url(&self, fallback: &str) -> String {
        self.cfg
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .trim_end_matches('/')
            .to_string()
    }

    fn call_gemini(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(GEMINI_BASE_URL),
            self.cfg.model
        );
        let payload = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "temperature": self.cfg.temperature,
                "responseMimeType": "application/json"
            }
        });
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential)
            .json(&payload)
            .send()
            .map_err(transport_error)?;
        let json = read_success_json(response)?;
        extract_gemini_text(&json)
            .ok_or_else(|| EngineError::Service("gemini response missing text content".into()))
    }

    fn call_openai_compatible(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        let url = format!("{}/v1/chat/completions", self.base_url(OPENAI_BASE_URL));
        let payload = serde_json::json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.cfg.temperature
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .json(&payload)
            .send()
            .map_err(transport_error)?;
        let json = read_success_json(response)?;
        extract_openai_compatible_text(&json).ok_or_else(|| {
            EngineError::Service("openai-compatible response missing text content".into())
        })
    }
}

impl TranslationEngine for RemoteEngine {
    fn name(&self) -> &str {
        &self.label
    }

    fn call(&self, prompt: &str, credential: &str) -> Result<String, EngineError> {
        match self.cfg.provider {
            EngineProvider::Gemini => self.call_gemini(prompt, credential),
            EngineProvider::OpenAiCompatible => self.call_openai_compatible(prompt, credential),
        }
    }
}

fn transport_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Service(format!("request timed out: {err}"))
    } else {
        EngineError::Service(format!("transport failure: {err}"))
    }
}

fn read_success_json(response: reqwest::blocking::Response) -> Result<Value, EngineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(EngineError::from_status(status.as_u16(), &body));
    }
    response
        .json::<Value>()
        .map_err(|err| EngineError::Service(format!("unreadable response body: {err}")))
}

fn extract_gemini_text(json: &Value) -> Option<String> {
    let parts = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(Value::as_array)?;
    let chunks: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.concat())
    }
}

fn extract_openai_compatible_text(json: &Value) -> Option<String> {
    let choices = json.get("choices").and_then(Value::as_array)?;
    let first = choices.first()?;
    let content = first.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => {
            let chunks: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.join("\n"))
            }
        }
        _ => None,
    }
}
