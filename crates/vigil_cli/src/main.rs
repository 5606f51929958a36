//! Vigil CLI: incremental static analysis from the command line.
//!
//! Provides `vigil check` for a one-shot analysis of the project,
//! `vigil watch` for continuous incremental analysis as files change, and
//! the hidden `vigil worker` entry point that the orchestrator spawns for
//! each engine.

#![warn(missing_docs)]

mod check;
mod pipeline;
mod sink;
mod watch;
mod worker;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Vigil: incremental analysis that keeps up with your edits.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Vigil incremental analysis")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `vigil.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze the project once and report every issue.
    Check(CheckArgs),
    /// Analyze the project, then re-analyze changed files until interrupted.
    Watch(WatchArgs),
    /// Serve one engine over stdio. Started by the orchestrator.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// Arguments for the `vigil check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Output format for issues.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Run engines inside this process instead of worker processes.
    #[arg(long)]
    pub in_process: bool,
}

/// Arguments for the `vigil watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Polling interval in milliseconds (default: `watch.poll_interval_ms`).
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Run engines inside this process instead of worker processes.
    #[arg(long)]
    pub in_process: bool,
}

/// Arguments for the hidden `vigil worker` subcommand.
///
/// The configuration file comes from the global `--config` flag.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Engine to serve (`check` or `lint`).
    #[arg(long)]
    pub engine: String,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Issue output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global).await,
        Command::Watch(ref args) => watch::run(args, &global).await,
        Command::Worker(ref args) => worker::run(args, &global).await,
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the log subscriber. Logs go to stderr: a worker's stdout is its
/// RPC channel.
fn init_tracing(global: &GlobalArgs) {
    let default = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .try_init();
}
