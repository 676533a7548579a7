//! mathango - inspect the configuration the mathanGO backend resolves at startup.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use crossterm::style::Stylize;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod logging;
mod output;

use mathango_core::{ConfigError, Environment, ProcessConfig, SettingReport};

/// Show the bind address, port, environment and API key the backend would use.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Load this env file instead of searching for `.env`.
    #[arg(long = "env-file", value_name = "PATH", conflicts_with = "no_env_file")]
    env_file: Option<PathBuf>,

    /// Skip env file loading.
    #[arg(long = "no-env-file")]
    no_env_file: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Show where each value came from.
    #[arg(long)]
    sources: bool,

    /// Fail unless PORT is a valid port number and GEMINI_API_KEY is set.
    #[arg(long)]
    check: bool,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

/// Rendering of the resolved configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `KEY: value` lines
    Text,
    /// Pretty-printed JSON
    Json,
}

/// JSON document printed by `--format json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Resolved settings
    #[serde(flatten)]
    config: &'a ProcessConfig,
    /// `address:port` for the listener
    bind_target: String,
    /// Env file that was merged, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    env_file: Option<&'a Path>,
    /// Per-setting sources, with `--sources`
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<SettingReport>>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let env = load_environment(&args, Environment::capture());

    let _log_guard = match logging::init_logging(env.get("RUST_LOG"), args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            output::eprintln(format_args!("Failed to initialize logging: {e}"));
            None
        },
    };

    let config = ProcessConfig::resolve(&env);
    tracing::info!(
        bind = %config.bind_target(),
        environment = %config.environment(),
        api_key = %config.masked_api_key(),
        env_file = ?env.env_file_path(),
        "Configuration resolved"
    );

    match run(&args, &config, &env) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Application error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Merge the env file selected by `args` into `base`, best effort.
fn load_environment(args: &CliArgs, base: Environment) -> Environment {
    if args.no_env_file {
        base
    } else if let Some(path) = &args.env_file {
        base.with_env_file(path)
    } else {
        base.with_dotenv()
    }
}

/// Print the configuration and run the optional check.
///
/// Returns `false` when `--check` found a problem.
fn run(args: &CliArgs, config: &ProcessConfig, env: &Environment) -> Result<bool> {
    let rendered = match args.format {
        Format::Text => {
            let styled = color_enabled(env, std::io::stdout().is_terminal());
            render_text(config, env, args.sources, styled)
        },
        Format::Json => render_json(config, env, args.sources)?,
    };
    output::print(format_args!("{rendered}"));

    Ok(!args.check || check(config))
}

/// Whether text output may carry terminal styling.
///
/// Only when stdout is a terminal and `NO_COLOR` is unset or empty.
fn color_enabled(env: &Environment, is_terminal: bool) -> bool {
    is_terminal && env.get("NO_COLOR").is_none_or(str::is_empty)
}

/// One `KEY: value` line per setting.
fn render_text(config: &ProcessConfig, env: &Environment, sources: bool, styled: bool) -> String {
    let mut out = String::new();
    for setting in config.report(env) {
        let _ = if styled {
            write!(out, "{}: {}", setting.key.bold(), setting.value)
        } else {
            write!(out, "{}: {}", setting.key, setting.value)
        };
        if sources {
            let source = format!("({})", setting.source);
            let _ = if styled {
                write!(out, " {}", source.dim())
            } else {
                write!(out, " {source}")
            };
        }
        out.push('\n');
    }
    out
}

/// Pretty JSON document with a trailing newline.
fn render_json(config: &ProcessConfig, env: &Environment, sources: bool) -> Result<String> {
    let document = JsonOutput {
        config,
        bind_target: config.bind_target(),
        env_file: env.env_file_path(),
        sources: sources.then(|| config.report(env)),
    };
    let mut json = serde_json::to_string_pretty(&document)?;
    json.push('\n');
    Ok(json)
}

/// Validate the settings the backend cannot start without.
fn check(config: &ProcessConfig) -> bool {
    let problems: Vec<ConfigError> = [config.port_number().err(), config.require_api_key().err()]
        .into_iter()
        .flatten()
        .collect();

    for problem in &problems {
        tracing::error!(error = %problem, "Configuration check failed");
    }
    problems.is_empty()
}
