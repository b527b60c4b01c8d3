// src/watch/session.rs

use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::errors::{RerunError, Result};
use crate::resolve::WatchSet;
use crate::watch::filter::EventFilter;

/// One watch set's worth of registered directories and their event stream.
///
/// Sessions are single-use: after the first relevant event the caller closes
/// the session and opens a new one from a freshly resolved [`WatchSet`].
pub struct WatchSession {
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    filter: EventFilter,
    registered: usize,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("registered", &self.registered)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl WatchSession {
    /// Register every directory of `set` (non-recursively; one Go package
    /// per directory).
    ///
    /// A directory that vanished between resolution and registration is
    /// skipped with a warning. Opening fails only if nothing at all could be
    /// registered.
    pub fn open(set: &WatchSet, filter: EventFilter) -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, events) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is gone only once the session is drained.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;

        let mut registered = 0;
        let mut last_error = None;
        for dir in set.dirs() {
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => registered += 1,
                Err(err) => {
                    warn!(dir = ?dir, error = %err, "cannot watch directory; skipping");
                    last_error = Some(err);
                }
            }
        }

        if registered == 0 {
            if let Some(err) = last_error {
                return Err(RerunError::Watch(err));
            }
        }

        debug!(registered, "watcher session opened");
        Ok(Self {
            watcher,
            events,
            filter,
            registered,
        })
    }

    /// Number of directories successfully registered.
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Wait for the next change to a relevant file and return its path.
    ///
    /// Irrelevant events and watcher errors are consumed silently. Returns
    /// `None` if the event source closed. Cancel-safe.
    pub async fn next_relevant_event(&mut self) -> Option<PathBuf> {
        while let Some(res) = self.events.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "discarding watcher error");
                    continue;
                }
            };

            if matches!(event.kind, EventKind::Access(_)) {
                trace!(?event, "ignoring access event");
                continue;
            }

            if let Some(path) = event.paths.into_iter().find(|p| self.filter.is_relevant(p)) {
                return Some(path);
            }
        }
        None
    }

    /// Retire this session.
    ///
    /// Stops the underlying watcher and spawns a task that discards whatever
    /// is still queued until the event source reports closed. The task's
    /// result is the number of discarded items.
    pub fn close(self) -> JoinHandle<usize> {
        let WatchSession {
            watcher,
            mut events,
            registered,
            ..
        } = self;

        // Dropping the watcher drops the callback, and with it the sender.
        drop(watcher);

        tokio::spawn(async move {
            let mut discarded = 0usize;
            while events.recv().await.is_some() {
                discarded += 1;
            }
            debug!(registered, discarded, "retired watcher session drained");
            discarded
        })
    }
}
