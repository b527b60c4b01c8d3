// src/supervisor/actor.rs

use std::process::ExitStatus;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::supervisor::process::{self, LiveChild};
use crate::supervisor::{ChildNotice, Lifecycle, SupervisorEvent, SupervisorOptions};
use crate::types::{ProgramUnit, RestartRequest};

/// Sole owner of the supervised program's state.
pub(crate) struct SupervisorActor {
    unit: ProgramUnit,
    options: SupervisorOptions,
    requests: mpsc::Receiver<RestartRequest>,
    notices_tx: mpsc::UnboundedSender<ChildNotice>,
    notices: mpsc::UnboundedReceiver<ChildNotice>,
    events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
    lifecycle: Lifecycle,
    /// Incremented on every launch attempt; stale notices carry old values.
    generation: u64,
    child: Option<LiveChild>,
    /// Whether the last request asked for something to be running.
    wants_running: bool,
    last_status: Option<ExitStatus>,
}

impl SupervisorActor {
    pub(crate) fn new(
        unit: ProgramUnit,
        options: SupervisorOptions,
        requests: mpsc::Receiver<RestartRequest>,
        events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
    ) -> Self {
        let (notices_tx, notices) = mpsc::unbounded_channel();
        Self {
            unit,
            options,
            requests,
            notices_tx,
            notices,
            events,
            lifecycle: Lifecycle::Absent,
            generation: 0,
            child: None,
            wants_running: false,
            last_status: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(bin = ?self.unit.bin_path, "process supervisor started");

        loop {
            tokio::select! {
                biased;

                Some(notice) = self.notices.recv() => {
                    self.handle_notice(notice).await;
                }

                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
            }
        }

        self.stop_current().await;
        info!(last_status = ?self.last_status, "process supervisor finished");
    }

    async fn handle_request(&mut self, request: RestartRequest) {
        debug!(?request, lifecycle = ?self.lifecycle, "restart request");
        self.wants_running = request.relaunches();

        // Stop-before-start: the previous instance is fully reaped before
        // anything new is launched.
        self.stop_current().await;

        if request.relaunches() {
            self.launch();
        }
    }

    async fn handle_notice(&mut self, notice: ChildNotice) {
        match notice {
            ChildNotice::Exited { generation, status } => {
                let current = self.child.as_ref().map(|c| c.generation);
                if current != Some(generation) {
                    debug!(generation, ?current, "ignoring exit notice for retired instance");
                    return;
                }

                // The watchdog task already reaped the child; drop its handle.
                self.child = None;
                self.lifecycle = Lifecycle::Absent;
                self.last_status = status;
                info!(generation, ?status, "process quit, relaunch");
                self.emit(SupervisorEvent::Exited { generation, status });

                self.schedule_relaunch(generation);
            }

            ChildNotice::RelaunchDue { generation } => {
                if self.child.is_some() || self.generation != generation || !self.wants_running {
                    debug!(generation, "crash relaunch superseded by a newer request");
                    return;
                }

                self.launch();
                if self.child.is_none() {
                    // Keep retrying until the binary starts or a request
                    // takes over.
                    self.schedule_relaunch(self.generation);
                }
            }
        }
    }

    /// Deliver a `RelaunchDue` for `generation` after `relaunch_delay`.
    fn schedule_relaunch(&self, generation: u64) {
        let tx = self.notices_tx.clone();
        let delay = self.options.relaunch_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ChildNotice::RelaunchDue { generation });
        });
    }

    async fn stop_current(&mut self) {
        let Some(live) = self.child.take() else {
            return;
        };

        self.lifecycle = Lifecycle::Stopping;
        let generation = live.generation;
        let pid = live.pid;
        debug!(generation, ?pid, "stopping process");

        let status = live.stop(self.options.stop_timeout).await;

        self.last_status = status;
        self.lifecycle = Lifecycle::Absent;
        info!(generation, ?pid, ?status, "process stopped");
        self.emit(SupervisorEvent::Stopped { generation, status });
    }

    fn launch(&mut self) {
        debug_assert!(self.child.is_none(), "launch with a live child");

        self.lifecycle = Lifecycle::Launching;
        self.generation += 1;
        let generation = self.generation;

        match process::launch(&self.unit, generation, self.notices_tx.clone()) {
            Ok(live) => {
                let pid = live.pid;
                self.child = Some(live);
                self.lifecycle = Lifecycle::Running;
                self.emit(SupervisorEvent::Launched { generation, pid });
            }
            Err(err) => {
                error!(generation, error = %format!("{err:#}"), "error on starting process");
                self.lifecycle = Lifecycle::Absent;
                self.emit(SupervisorEvent::LaunchFailed {
                    generation,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
