mod logging;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_pipeline::{ExecutionPipeline, NdjsonWriter};
use relay_tools::{ToolContext, ToolRegistry};
use relay_types::{
    now_millis, ConfigLoader, ConfigOverrides, EffectiveConfig, RelayError, Request, Session,
};
use tokio::io::AsyncReadExt;

/// Relay -- session-scoped agent driver.
///
/// Reads one request from stdin (a JSON object with `message` and `tools`,
/// or plain text), runs the tools in order, and streams lifecycle events to
/// stdout as NDJSON.
#[derive(Parser, Debug)]
#[command(name = "relay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model label reported for the session
    #[arg(long, global = true)]
    model: Option<String>,

    /// Config file to load instead of ./.relay/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory that tools resolve relative paths against
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in tools and their input schemas as JSON
    Tools,

    /// Show the effective configuration and where each value came from
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

/// Request-level failures get one JSON line on stderr.
fn report_fatal(err: &anyhow::Error) {
    let line = serde_json::json!({
        "type": "error",
        "timestamp": now_millis(),
        "error": format!("{err:#}"),
    });
    eprintln!("{line}");
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let effective = load_config(&cli)?;
    logging::init(&effective.config.log)?;
    tracing::debug!(file = ?effective.source_file, "configuration loaded");

    match cli.command {
        Some(Commands::Tools) => print_tools(),
        Some(Commands::Config) => print_config(&effective),
        None => process_stdin(&effective).await,
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, RelayError> {
    let overrides = ConfigOverrides {
        model: cli.model.clone(),
        working_dir: cli.directory.clone(),
        log_level: cli.verbose.then(|| "debug".to_string()),
        log_file: cli.log_file.clone(),
    };

    let mut loader = ConfigLoader::new().with_overrides(overrides);
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path.clone());
    }
    loader.load()
}

async fn process_stdin(effective: &EffectiveConfig) -> anyhow::Result<()> {
    let config = &effective.config;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("cannot read request from stdin")?;
    let request = Request::parse(&input);

    let session = Session::new(config.model.clone())?;
    let working_dir = resolve_working_dir(config.working_dir.as_deref())?;
    let registry = ToolRegistry::with_builtins()?;

    let tools = registry.tool_count();

    let pipeline = ExecutionPipeline::new(registry, ToolContext::new(session, working_dir));
    let ctx = pipeline.context();
    tracing::debug!(
        session = %ctx.session().id(),
        model = %ctx.session().model(),
        cwd = %ctx.working_dir().display(),
        tools,
        "session started"
    );

    let summary = pipeline
        .process(&request, NdjsonWriter::new(std::io::stdout()))
        .await?;

    tracing::debug!(session = %summary.session_id, response = %summary.response, "session finished");
    Ok(())
}

/// Absolute working directory for tools; relative values are taken from
/// the process working directory.
fn resolve_working_dir(configured: Option<&Path>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let dir = match configured {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    if !dir.is_dir() {
        return Err(RelayError::ConfigError(format!(
            "working directory is not a directory: {}",
            dir.display()
        ))
        .into());
    }
    Ok(dir)
}

fn print_tools() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_builtins()?;
    println!("{}", serde_json::to_string_pretty(&registry.list_tools())?);
    Ok(())
}

fn print_config(effective: &EffectiveConfig) -> anyhow::Result<()> {
    let sources: BTreeMap<&str, String> = effective
        .sources
        .iter()
        .map(|(field, source)| (field.as_str(), source.to_string()))
        .collect();
    let report = serde_json::json!({
        "config": effective.config,
        "sources": sources,
        "file": effective.source_file,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
