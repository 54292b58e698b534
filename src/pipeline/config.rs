use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{
    find_default_config, load_config, AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILENAME,
};
use crate::models::{EngineProvider, RemoteEngineConfig};
use crate::pipeline::chunker::DEFAULT_CHUNK_CHARS;
use crate::pipeline::prompts::{default_prompt_files, PromptSet, DEFAULT_PROMPTS_DIR};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Trailing chunks in parallel, single result at the end.
    Batch,
    /// One chunk at a time with a progress event after each.
    Streaming,
}

impl DispatchMode {
    pub fn parse(s: Option<&str>) -> Self {
        match s.unwrap_or("batch").trim().to_ascii_lowercase().as_str() {
            "stream" | "streaming" => Self::Streaming,
            _ => Self::Batch,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub chunk_chars: Option<usize>,
    pub stream: bool,
    pub no_history: bool,
    pub trace: bool,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub config_path: PathBuf,

    pub mode: DispatchMode,
    pub chunk_chars: usize,
    pub tolerate_chunk_errors: bool,

    pub engine: RemoteEngineConfig,
    pub api_key: Option<String>,

    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub log_max_chars: usize,

    pub history_enabled: bool,
    pub history_dir: PathBuf,

    pub prompts: PromptSet,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let provider = EngineProvider::Gemini;
        Self {
            workdir: PathBuf::from("."),
            config_path: PathBuf::from(DEFAULT_CONFIG_FILENAME),
            mode: DispatchMode::Batch,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            tolerate_chunk_errors: true,
            engine: RemoteEngineConfig {
                provider,
                model: provider.default_model().to_string(),
                base_url: None,
                timeout_secs: 180,
                temperature: 0.3,
            },
            api_key: None,
            trace_dir: PathBuf::from("_trace"),
            trace_prompts: false,
            log_max_chars: 160,
            history_enabled: true,
            history_dir: PathBuf::from("history"),
            prompts: PromptSet::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_input_and_args(input: Option<&Path>, args: CliOverrides) -> anyhow::Result<Self> {
        let workdir = input
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        let workdir = workdir.canonicalize().unwrap_or(workdir);

        let cfg_file = args
            .config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, DEFAULT_CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            } else if args.config_path.is_some() {
                return Err(anyhow::anyhow!("config not found: {}", p.display()));
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| workdir.join(DEFAULT_CONFIG_FILENAME));
        Self::resolve(workdir, cfg_path, &file_cfg, args)
    }

    pub fn resolve(
        workdir: PathBuf,
        cfg_path: PathBuf,
        file_cfg: &AppConfig,
        args: CliOverrides,
    ) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config_dir = cfg_path
            .parent()
            .map(|p| p.to_path_buf())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| workdir.clone());
        let relative_to_config = |s: &str| {
            let p = PathBuf::from(s);
            if p.is_absolute() {
                p
            } else {
                config_dir.join(p)
            }
        };

        let mode = if args.stream {
            DispatchMode::Streaming
        } else {
            DispatchMode::parse(file_cfg.pipeline.mode.as_deref())
        };
        let chunk_chars = args
            .chunk_chars
            .or(file_cfg.pipeline.chunk_chars)
            .unwrap_or(DEFAULT_CHUNK_CHARS)
            .max(1);
        let tolerate_chunk_errors = file_cfg
            .pipeline
            .tolerate_chunk_errors
            .unwrap_or(defaults.tolerate_chunk_errors);

        let e = &file_cfg.engine;
        let provider = EngineProvider::parse(e.provider.as_deref())?;
        let engine = RemoteEngineConfig {
            provider,
            model: e
                .model
                .clone()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| provider.default_model().to_string()),
            base_url: e.base_url.clone(),
            timeout_secs: e.timeout_secs.unwrap_or(defaults.engine.timeout_secs),
            temperature: e.temperature.unwrap_or(defaults.engine.temperature),
        };
        let key_env = e
            .api_key_env
            .clone()
            .unwrap_or_else(|| provider.default_key_env().to_string());
        let api_key = args
            .api_key
            .or_else(|| e.api_key.clone())
            .or_else(|| std::env::var(&key_env).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let trace_dir = file_cfg
            .pipeline
            .trace_dir
            .as_deref()
            .map(&relative_to_config)
            .unwrap_or_else(|| workdir.join(&defaults.trace_dir));
        let trace_prompts = args.trace || file_cfg.pipeline.trace_prompts.unwrap_or(false);
        let log_max_chars = file_cfg
            .pipeline
            .log_max_chars
            .unwrap_or(defaults.log_max_chars);

        let history_enabled = !args.no_history && file_cfg.history.enabled.unwrap_or(true);
        let history_dir = file_cfg
            .history
            .dir
            .as_deref()
            .map(&relative_to_config)
            .unwrap_or_else(|| config_dir.join(&defaults.history_dir));

        let prompts = PromptSet::load(&cfg_path, &file_cfg.prompts).context("load prompts")?;

        Ok(Self {
            workdir,
            config_path: cfg_path,
            mode,
            chunk_chars,
            tolerate_chunk_errors,
            engine,
            api_key,
            trace_dir,
            trace_prompts,
            log_max_chars,
            history_enabled,
            history_dir,
            prompts,
        })
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[engine]
provider = "gemini"
model = "gemini-2.0-flash"
# The key is read from this environment variable unless api_key is set.
api_key_env = "GEMINI_API_KEY"
timeout_secs = 180
temperature = 0.3

# OpenAI-compatible servers:
# provider = "openai_compatible"
# model = "gpt-4o-mini"
# base_url = "https://api.openai.com"
# api_key_env = "OPENAI_API_KEY"

[pipeline]
chunk_chars = 5500
# "batch": later chunks are sent in parallel.
# "stream": one chunk at a time, NDJSON progress on stdout.
mode = "batch"
# Keep going with untranslated paragraphs when a later chunk fails.
tolerate_chunk_errors = true
trace_dir = "_trace"
trace_prompts = false
log_max_chars = 160

[prompts]
full = "prompts/full.txt"
translation_only = "prompts/translation_only.txt"

[history]
enabled = true
dir = "history"
"#;
