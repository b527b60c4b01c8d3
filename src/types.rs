// src/types.rs

//! Small domain types shared across the resolver, supervisor and engine.

use std::path::PathBuf;

/// The buildable target supervised by `rerun`.
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramUnit {
    /// Go import path of the main package (e.g. `example.com/app/cmd/server`).
    pub import_path: String,
    /// Last segment of the import path; the installed binary's file name.
    pub bin_name: String,
    /// Where the installed binary is launched from.
    pub bin_path: PathBuf,
    /// Arguments passed to the program on every launch.
    pub args: Vec<String>,
}

impl ProgramUnit {
    /// Binary name for an import path: its last `/`-separated segment,
    /// skipping a module major-version suffix such as `/v2`.
    pub fn bin_name_for(import_path: &str) -> String {
        let mut segments = import_path.trim_end_matches('/').rsplit('/');
        let last = segments.next().unwrap_or(import_path);
        if is_major_version_suffix(last) {
            if let Some(previous) = segments.next() {
                return previous.to_string();
            }
        }
        last.to_string()
    }
}

fn is_major_version_suffix(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Signal carried from the rerun loop to the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartRequest {
    /// Stop the current instance (if any) and start a new one.
    Relaunch,
    /// Stop the current instance (if any) and leave nothing running.
    Stop,
}

impl RestartRequest {
    pub fn from_relaunch(relaunch: bool) -> Self {
        if relaunch {
            RestartRequest::Relaunch
        } else {
            RestartRequest::Stop
        }
    }

    pub fn relaunches(self) -> bool {
        matches!(self, RestartRequest::Relaunch)
    }
}
