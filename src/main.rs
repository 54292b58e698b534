use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};

use lit_translator::history::{HistoryStore, JsonHistoryStore};
use lit_translator::ir::PipelineResult;
use lit_translator::models::RemoteEngine;
use lit_translator::pipeline::{
    init_default_config, CliOverrides, DispatchMode, PipelineConfig, TranslatorPipeline,
};
use lit_translator::progress::ConsoleProgress;
use lit_translator::service::run_job;
use lit_translator::source::read_paragraphs;
use lit_translator::stream::{NdjsonSink, NullSink, ProgressSink};

#[derive(Parser, Debug)]
#[command(name = "lit-translator")]
#[command(about = "English to Chinese literary translator (chunked remote LLM calls + analysis)", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input document (.txt, .md or .docx)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Write the result JSON here (default: stdout in batch mode)
    #[arg(short, long, value_name = "JSON")]
    output: Option<PathBuf>,

    /// Translate chunk by chunk and write NDJSON progress events to stdout
    #[arg(long)]
    stream: bool,

    /// Character budget per request chunk
    #[arg(long, value_name = "N")]
    chunk_chars: Option<usize>,

    /// API key (default: [engine].api_key or the env var named by api_key_env)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Config file path (default: search for lit-translator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump prompts and raw replies into the trace directory
    #[arg(long)]
    trace: bool,

    /// Do not save the result to history
    #[arg(long)]
    no_history: bool,

    /// List saved runs, newest first, then exit
    #[arg(long)]
    list_history: bool,

    /// Delete a saved run by id, then exit
    #[arg(long, value_name = "ID")]
    remove_history: Option<String>,

    /// No progress output on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let overrides = CliOverrides {
        config_path: args.config.clone(),
        api_key: args.api_key.clone(),
        chunk_chars: args.chunk_chars,
        stream: args.stream,
        no_history: args.no_history,
        trace: args.trace,
    };
    let cfg = PipelineConfig::from_input_and_args(args.input.as_deref(), overrides)
        .context("build config")?;

    if args.list_history {
        return list_history(&JsonHistoryStore::new(cfg.history_dir.clone()));
    }
    if let Some(id) = args.remove_history.as_deref() {
        let store = JsonHistoryStore::new(cfg.history_dir.clone());
        if store.remove(id)? {
            eprintln!("Removed: {id}");
        } else {
            eprintln!("No such history entry: {id}");
        }
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  lit-translator <story.txt|story.docx> [-o result.json] [--stream]\n\nTIPS:\n  - Default config search: lit-translator.toml (upwards), or set LIT_TRANSLATOR_CONFIG.\n  - Run with --init-config to write an editable config and prompt files.\n"
            );
            return Ok(());
        }
    };

    progress.info(format!("Read: {}", input.display()));
    let paragraphs = read_paragraphs(&input)?;

    let engine = RemoteEngine::new(cfg.engine.clone()).context("create engine")?;
    let pipeline = TranslatorPipeline::new(Box::new(engine), &cfg, progress.clone());
    let store = cfg
        .history_enabled
        .then(|| JsonHistoryStore::new(cfg.history_dir.clone()));
    let history = store.as_ref().map(|s| s as &dyn HistoryStore);

    let result = match cfg.mode {
        DispatchMode::Batch => {
            let mut sink = NullSink;
            run(&pipeline, history, &paragraphs, &cfg, &mut sink, &progress)?
        }
        DispatchMode::Streaming => {
            let stdout = std::io::stdout();
            let mut sink = NdjsonSink::new(stdout.lock());
            run(&pipeline, history, &paragraphs, &cfg, &mut sink, &progress)?
        }
    };

    match (&args.output, cfg.mode) {
        (Some(path), _) => write_result(path, &result)?,
        (None, DispatchMode::Batch) => {
            let json = serde_json::to_string_pretty(&result).context("serialize result")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("write stdout")?;
        }
        (None, DispatchMode::Streaming) => {}
    }
    progress.info(format!(
        "Done. {} paragraphs, title: {} / {}",
        result.translation.len(),
        result.title.en,
        result.title.zh
    ));
    Ok(())
}

fn run(
    pipeline: &TranslatorPipeline,
    history: Option<&dyn HistoryStore>,
    paragraphs: &[String],
    cfg: &PipelineConfig,
    sink: &mut dyn ProgressSink,
    progress: &ConsoleProgress,
) -> anyhow::Result<PipelineResult> {
    let result = run_job(
        pipeline,
        history,
        paragraphs,
        cfg.api_key.as_deref(),
        cfg.mode,
        sink,
        progress,
    )?;
    Ok(result)
}

fn write_result(path: &Path, result: &PipelineResult) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir: {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(result).context("serialize result")?;
    std::fs::write(path, json).with_context(|| format!("write output: {}", path.display()))?;
    Ok(())
}

fn list_history(store: &JsonHistoryStore) -> anyhow::Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        eprintln!("History is empty: {}", store.dir().display());
        return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    for rec in records {
        writeln!(
            stdout,
            "{}  {}  {} / {}  ({} paragraphs)",
            rec.id,
            rec.created_at.format("%Y-%m-%d %H:%M:%S"),
            rec.result.title.en,
            rec.result.title.zh,
            rec.result.translation.len()
        )
        .context("write stdout")?;
    }
    Ok(())
}
