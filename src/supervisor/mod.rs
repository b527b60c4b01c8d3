// src/supervisor/mod.rs

//! Process supervisor.
//!
//! A single actor task owns the running program: its lifecycle state, the
//! generation counter, the child handle (through its watchdog task) and the
//! last exit status. Everything else talks to it through channels:
//!
//! - [`SupervisorHandle`] sends [`RestartRequest`]s in.
//! - Per-child watchdog tasks send exit notices back in.
//! - Optional [`SupervisorEvent`]s go out for observers and tests.
//!
//! Because one task handles every message in turn, a stop/start transition
//! can never interleave with a crash report or a second request.
//!
//! - [`actor`] owns the state machine.
//! - [`process`] launches a child and performs interrupt/kill/reap.

use std::process::ExitStatus;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConfigFile;
use crate::errors::{RerunError, Result};
use crate::types::{ProgramUnit, RestartRequest};

pub mod actor;
pub mod process;

use actor::SupervisorActor;

/// Capacity of the restart request channel.
pub const REQUEST_CHANNEL_CAPACITY: usize = 8;

/// Lifecycle of the supervised program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Absent,
    Launching,
    Running,
    Stopping,
}

/// Policy knobs for stopping and relaunching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Force-kill if the program has not exited this long after the
    /// interrupt. `None` waits indefinitely.
    pub stop_timeout: Option<Duration>,
    /// Pause before relaunching a program that exited on its own.
    pub relaunch_delay: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            stop_timeout: None,
            relaunch_delay: Duration::from_secs(1),
        }
    }
}

impl From<&ConfigFile> for SupervisorOptions {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            stop_timeout: cfg.supervisor.stop_timeout,
            relaunch_delay: cfg.supervisor.relaunch_delay,
        }
    }
}

/// Observable lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A new instance is running.
    Launched { generation: u64, pid: Option<u32> },
    /// The instance exited without being asked to.
    Exited {
        generation: u64,
        status: Option<ExitStatus>,
    },
    /// The instance was stopped on request and has been reaped.
    Stopped {
        generation: u64,
        status: Option<ExitStatus>,
    },
    /// Starting a new instance failed; nothing is running.
    LaunchFailed { generation: u64, error: String },
}

/// Messages from child watchdog tasks and timers back to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildNotice {
    Exited {
        generation: u64,
        status: Option<ExitStatus>,
    },
    RelaunchDue {
        generation: u64,
    },
}

/// Sending side of the restart request channel.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<RestartRequest>,
}

impl SupervisorHandle {
    pub fn new(tx: mpsc::Sender<RestartRequest>) -> Self {
        Self { tx }
    }

    /// Stop the current instance, then start a new one if `relaunch`.
    pub async fn request_restart(&self, relaunch: bool) -> Result<()> {
        self.tx
            .send(RestartRequest::from_relaunch(relaunch))
            .await
            .map_err(|_| RerunError::Other(anyhow!("process supervisor is no longer running")))
    }

    pub async fn relaunch(&self) -> Result<()> {
        self.request_restart(true).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request_restart(false).await
    }
}

/// Entry point for starting the supervisor actor.
#[derive(Debug)]
pub struct Supervisor;

impl Supervisor {
    /// Create the restart request channel.
    pub fn channel() -> (SupervisorHandle, mpsc::Receiver<RestartRequest>) {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        (SupervisorHandle::new(tx), rx)
    }

    /// Spawn the actor. It runs until every request sender is dropped, then
    /// stops the live instance (if any) and returns.
    pub fn spawn(
        unit: ProgramUnit,
        options: SupervisorOptions,
        requests: mpsc::Receiver<RestartRequest>,
        events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
    ) -> JoinHandle<()> {
        let actor = SupervisorActor::new(unit, options, requests, events);
        tokio::spawn(actor.run())
    }
}
