// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod resolve;
pub mod supervisor;
pub mod toolchain;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_optional;
use crate::engine::{CycleCore, CycleOptions, LoopOptions, RerunLoop};
use crate::errors::Result;
use crate::resolve::resolve_program_unit;
use crate::supervisor::{Supervisor, SupervisorOptions};
use crate::toolchain::{GoToolchain, ToolchainOptions};

/// Environment variable that redirects where the installed binary is
/// launched from.
pub const BIN_DIR_ENV_VAR: &str = "GOBIN";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - program unit resolution (fatal on failure)
/// - the process supervisor (unless `--no-run`)
/// - the rerun loop and its watcher sessions
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_optional(args.config.as_deref().map(Path::new))?;
    debug!(?cfg, "effective configuration");

    let toolchain = GoToolchain::new(ToolchainOptions {
        go_binary: cfg.toolchain.go.clone(),
        race: args.race,
        build_tags: args.build_tags.clone(),
    });

    let bin_dir = bin_dir_override();
    let unit = resolve_program_unit(
        &toolchain,
        &args.import_path,
        args.args.clone(),
        bin_dir.as_deref(),
    )
    .await?;

    let cycle_options = CycleOptions {
        run_tests: args.test,
        verify_build: args.build,
        never_run: args.no_run,
    };

    // The supervisor and its watchdog only exist when we launch the program.
    let (supervisor, supervisor_task) = if cycle_options.never_run {
        info!("--no-run: the program will not be launched");
        (None, None)
    } else {
        let (handle, requests) = Supervisor::channel();
        let task = Supervisor::spawn(
            unit.clone(),
            SupervisorOptions::from(&cfg),
            requests,
            None,
        );
        (Some(handle), Some(task))
    };

    // Ctrl-C → graceful shutdown.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(()).await;
    });

    let rerun_loop = RerunLoop::new(
        toolchain,
        unit,
        CycleCore::new(cycle_options),
        supervisor,
        LoopOptions::from_config(&cfg)?,
    );

    // The loop owns the only request sender; once it returns, the supervisor
    // stops whatever is running and exits.
    let result = rerun_loop.run(shutdown_rx).await;

    if let Some(task) = supervisor_task {
        let _ = task.await;
    }

    result
}

/// `GOBIN`, if set and non-empty.
pub fn bin_dir_override() -> Option<PathBuf> {
    std::env::var_os(BIN_DIR_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
