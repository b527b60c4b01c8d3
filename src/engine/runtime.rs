// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::resolve::resolve_watch_set;
use crate::supervisor::SupervisorHandle;
use crate::toolchain::{BuildOutcome, Toolchain};
use crate::types::ProgramUnit;
use crate::watch::{EventFilter, WatchSession};

use super::core::{CycleCommand, CycleCore, CycleEvent, CycleSummary, Report};

/// Watcher-related knobs for the loop.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub filter: EventFilter,
    /// Pause before retrying a watcher session that failed to open.
    pub reopen_delay: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            filter: EventFilter::go_sources(),
            reopen_delay: Duration::from_secs(1),
        }
    }
}

impl LoopOptions {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Ok(Self {
            filter: EventFilter::new(&cfg.watch.extensions, &cfg.watch.exclude)?,
            reopen_delay: cfg.watch.reopen_delay,
        })
    }
}

/// The coordinator: watch, rebuild, test, verify, restart.
///
/// This is the IO shell around [`CycleCore`]. It runs toolchain phases one
/// at a time, prints what the core asks it to print, and forwards restart
/// requests to the supervisor. `supervisor` is `None` in `--no-run` mode.
pub struct RerunLoop<T: Toolchain> {
    toolchain: T,
    unit: ProgramUnit,
    core: CycleCore,
    supervisor: Option<SupervisorHandle>,
    options: LoopOptions,
}

impl<T: Toolchain> fmt::Debug for RerunLoop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RerunLoop")
            .field("unit", &self.unit)
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Toolchain> RerunLoop<T> {
    pub fn new(
        toolchain: T,
        unit: ProgramUnit,
        core: CycleCore,
        supervisor: Option<SupervisorHandle>,
        options: LoopOptions,
    ) -> Self {
        Self {
            toolchain,
            unit,
            core,
            supervisor,
            options,
        }
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn core(&self) -> &CycleCore {
        &self.core
    }

    /// Main loop.
    ///
    /// Runs the initial pass, then rebuilds on every relevant change until a
    /// message arrives on `shutdown` or resolving the root package fails.
    /// Opening the first watcher session is fatal on error; later sessions
    /// are retried.
    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        info!(import_path = %self.unit.import_path, args = ?self.unit.args, "setting up");

        if !self.cycle_unless_shutdown(&mut shutdown).await {
            return Ok(());
        }

        let set = resolve_watch_set(&self.toolchain, &self.unit.import_path).await?;
        let mut session = WatchSession::open(&set, self.options.filter.clone())?;
        info!(dirs = set.len(), "watching for changes");

        loop {
            let changed = tokio::select! {
                changed = session.next_relevant_event() => changed,
                Some(()) = shutdown.recv() => {
                    info!("shutdown requested");
                    let _drain = session.close();
                    self.stop_program().await;
                    return Ok(());
                }
            };

            match changed {
                Some(path) => info!(path = ?path, "change detected"),
                None => warn!("watcher event source closed unexpectedly; rescanning"),
            }

            // Retire the old session, then start watching the fresh set
            // before rebuilding so nothing saved mid-build is missed.
            let _drain = session.close();
            info!("rescanning");
            session = self.reopen_session().await?;

            if !self.cycle_unless_shutdown(&mut shutdown).await {
                let _drain = session.close();
                return Ok(());
            }
        }
    }

    /// Run one compile/test/verify/restart sequence.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let mut pending: VecDeque<CycleCommand> =
            self.core.step(CycleEvent::Start).commands.into();

        while let Some(command) = pending.pop_front() {
            let event = match command {
                CycleCommand::Compile => {
                    let res = self.toolchain.install(&self.unit).await;
                    Some(CycleEvent::Compiled(outcome_or_failure(res, "install")))
                }
                CycleCommand::RunTests => {
                    let res = self.toolchain.test(&self.unit).await;
                    Some(CycleEvent::Tested(outcome_or_failure(res, "test")))
                }
                CycleCommand::VerifyBuild => {
                    let res = self.toolchain.build(&self.unit).await;
                    Some(CycleEvent::Verified(outcome_or_failure(res, "build")))
                }
                CycleCommand::Report(report) => {
                    print_report(report);
                    None
                }
                CycleCommand::Restart => {
                    self.request_relaunch().await;
                    None
                }
                CycleCommand::Finish => break,
            };

            if let Some(event) = event {
                pending.extend(self.core.step(event).commands);
            }
        }

        self.core.summary().clone()
    }

    /// Run a cycle, abandoning it if shutdown is requested first.
    ///
    /// Returns `false` on shutdown, after the program has been told to stop.
    /// Dropping the cycle kills any toolchain command still running.
    async fn cycle_unless_shutdown(&mut self, shutdown: &mut mpsc::Receiver<()>) -> bool {
        tokio::select! {
            summary = self.run_cycle() => {
                debug!(?summary, "cycle finished");
                true
            }
            Some(()) = shutdown.recv() => {
                info!("shutdown requested during build");
                self.stop_program().await;
                false
            }
        }
    }

    /// Resolve the watch set again and open a session on it.
    ///
    /// Resolution failure of the root package is returned; failure to open
    /// the session is retried after `reopen_delay`.
    async fn reopen_session(&self) -> Result<WatchSession> {
        loop {
            let set = resolve_watch_set(&self.toolchain, &self.unit.import_path).await?;
            match WatchSession::open(&set, self.options.filter.clone()) {
                Ok(session) => {
                    debug!(dirs = set.len(), registered = session.registered(), "watching");
                    return Ok(session);
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        delay = ?self.options.reopen_delay,
                        "cannot open watcher session; retrying"
                    );
                    tokio::time::sleep(self.options.reopen_delay).await;
                }
            }
        }
    }

    async fn request_relaunch(&self) {
        let Some(supervisor) = &self.supervisor else {
            return;
        };
        if let Err(err) = supervisor.relaunch().await {
            error!(error = %err, "cannot deliver restart request");
        }
    }

    async fn stop_program(&self) {
        if let Some(supervisor) = &self.supervisor {
            if let Err(err) = supervisor.stop().await {
                debug!(error = %err, "supervisor already gone at shutdown");
            }
        }
    }
}

/// Toolchain invocation errors become failed outcomes; the loop keeps going.
fn outcome_or_failure(res: Result<BuildOutcome>, phase: &str) -> BuildOutcome {
    res.unwrap_or_else(|err| {
        warn!(phase, error = %err, "toolchain invocation failed");
        BuildOutcome::from_error(&err)
    })
}

fn print_report(report: Report) {
    match report {
        Report::Diagnostics(text) => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            if !text.ends_with('\n') {
                let _ = stdout.write_all(b"\n");
            }
            let _ = stdout.flush();
        }
        Report::Notice(message) => info!("{message}"),
    }
}
