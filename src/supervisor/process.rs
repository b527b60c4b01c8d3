// src/supervisor/process.rs

//! Launching, stopping and reaping a single program instance.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::supervisor::ChildNotice;
use crate::types::ProgramUnit;

/// Stop instruction delivered to a child's watchdog task.
#[derive(Debug, Clone, Copy)]
struct StopCommand {
    grace: Option<Duration>,
}

/// Handle for a launched instance.
///
/// The `Child` itself lives inside the watchdog task; this handle can only
/// ask that task to stop the child and then wait for it to report the exit
/// status.
#[derive(Debug)]
pub(crate) struct LiveChild {
    pub generation: u64,
    pub pid: Option<u32>,
    stop_tx: Option<oneshot::Sender<StopCommand>>,
    task: JoinHandle<Option<ExitStatus>>,
}

impl LiveChild {
    /// Interrupt the child, escalate to a kill if needed, and wait until it
    /// has been reaped. Returns its exit status if one could be collected.
    pub async fn stop(mut self, grace: Option<Duration>) -> Option<ExitStatus> {
        if let Some(stop_tx) = self.stop_tx.take() {
            if stop_tx.send(StopCommand { grace }).is_err() {
                debug!(
                    generation = self.generation,
                    "process already exited before stop was requested"
                );
            }
        }

        match self.task.await {
            Ok(status) => status,
            Err(err) => {
                warn!(generation = self.generation, error = %err, "child watchdog task failed");
                None
            }
        }
    }
}

/// Start `unit`'s binary with the supervisor's own stdio and spawn its
/// watchdog task.
pub(crate) fn launch(
    unit: &ProgramUnit,
    generation: u64,
    notices: mpsc::UnboundedSender<ChildNotice>,
) -> Result<LiveChild> {
    info!(bin = ?unit.bin_path, args = ?unit.args, generation, "launch");

    let child = Command::new(&unit.bin_path)
        .args(&unit.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("starting process {:?}", unit.bin_path))?;

    let pid = child.id();
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(watch_child(child, generation, stop_rx, notices));

    Ok(LiveChild {
        generation,
        pid,
        stop_tx: Some(stop_tx),
        task,
    })
}

/// Own the child until it exits on its own or a stop is requested.
///
/// Only an exit nobody asked for is reported as a notice; a requested stop
/// hands its status back through the join handle instead.
async fn watch_child(
    mut child: Child,
    generation: u64,
    mut stop_rx: oneshot::Receiver<StopCommand>,
    notices: mpsc::UnboundedSender<ChildNotice>,
) -> Option<ExitStatus> {
    tokio::select! {
        status_res = child.wait() => {
            let status = match status_res {
                Ok(status) => Some(status),
                Err(err) => {
                    warn!(generation, error = %err, "waiting for process failed");
                    None
                }
            };
            debug!(generation, ?status, "process exited on its own");
            let _ = notices.send(ChildNotice::Exited { generation, status });
            status
        }

        stop = &mut stop_rx => {
            match stop {
                Ok(command) => terminate(&mut child, command.grace).await,
                Err(_) => {
                    // Handle dropped without a stop: do not leave the child behind.
                    debug!(generation, "stop channel closed; killing process");
                    terminate(&mut child, Some(Duration::ZERO)).await
                }
            }
        }
    }
}

/// Interrupt, optionally escalate to kill after `grace`, then reap.
async fn terminate(child: &mut Child, grace: Option<Duration>) -> Option<ExitStatus> {
    let pid = child.id();

    if let Err(err) = interrupt(child) {
        warn!(
            ?pid,
            error = %err,
            "error on sending interrupt to process; will now hard-kill it"
        );
        if let Err(err) = child.start_kill() {
            warn!(?pid, error = %err, "failed to kill process");
        }
    }

    let waited = match grace {
        None => child.wait().await,
        Some(grace) => match tokio::time::timeout(grace, child.wait()).await {
            Ok(res) => res,
            Err(_) => {
                warn!(?pid, ?grace, "process did not exit after interrupt; killing");
                if let Err(err) = child.start_kill() {
                    warn!(?pid, error = %err, "failed to kill process");
                }
                child.wait().await
            }
        },
    };

    match waited {
        Ok(status) => {
            debug!(?pid, %status, "process stopped");
            Some(status)
        }
        Err(err) => {
            warn!(?pid, error = %err, "waiting for stopped process failed");
            None
        }
    }
}

#[cfg(unix)]
fn interrupt(child: &Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    kill(Pid::from_raw(pid), Signal::SIGINT).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupt signals are not supported on this platform",
    ))
}
