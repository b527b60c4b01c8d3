// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rerun",
    version,
    about = "Rebuild, test and restart a Go program whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Run tests before (re)launching; failing tests suppress the restart.
    #[arg(long)]
    pub test: bool,

    /// Also run a verification build (`go build`) when tests pass.
    #[arg(long)]
    pub build: bool,

    /// Never launch the program (watch + test/build only).
    #[arg(long)]
    pub no_run: bool,

    /// Pass `-race` to every toolchain command.
    #[arg(long)]
    pub race: bool,

    /// Build tags for the verification build step.
    #[arg(long, value_name = "TAGS")]
    pub build_tags: Option<String>,

    /// Path to an optional config file (TOML).
    ///
    /// Default: `Rerun.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Import path of the main package to supervise.
    #[arg(value_name = "IMPORT_PATH")]
    pub import_path: String,

    /// Arguments passed verbatim to the program on every launch.
    #[arg(
        value_name = "ARG",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
