// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Configuration exactly as read from `Rerun.toml`.
///
/// ```toml
/// [supervisor]
/// stop_timeout = "5s"
/// relaunch_delay = "1s"
///
/// [watch]
/// extensions = ["go"]
/// exclude = ["**/.#*"]
/// reopen_delay = "1s"
///
/// [toolchain]
/// go = "go"
/// ```
///
/// Every section is optional. Durations stay strings here; they are parsed
/// when converting into [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: RawSupervisorSection,

    #[serde(default)]
    pub watch: RawWatchSection,

    #[serde(default)]
    pub toolchain: ToolchainSection,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSupervisorSection {
    /// How long to wait after the interrupt signal before force-killing.
    ///
    /// Absent means: wait for the program to exit, however long it takes.
    #[serde(default)]
    pub stop_timeout: Option<String>,

    /// Pause before relaunching a program that exited on its own.
    #[serde(default)]
    pub relaunch_delay: Option<String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWatchSection {
    /// Source extensions that count as relevant changes (without the dot).
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    /// Glob patterns for changed paths to ignore even if the extension matches.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Pause before retrying when a watcher session cannot be opened.
    #[serde(default)]
    pub reopen_delay: Option<String>,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSection {
    /// Name or path of the `go` executable.
    #[serde(default = "default_go_binary")]
    pub go: String,
}

fn default_go_binary() -> String {
    "go".to_string()
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            go: default_go_binary(),
        }
    }
}

/// Validated configuration used by the rest of the application.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub supervisor: SupervisorSection,
    pub watch: WatchSection,
    pub toolchain: ToolchainSection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSection {
    pub stop_timeout: Option<Duration>,
    pub relaunch_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSection {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub reopen_delay: Duration,
}

pub const DEFAULT_RELAUNCH_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REOPEN_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_EXTENSION: &str = "go";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            supervisor: SupervisorSection {
                stop_timeout: None,
                relaunch_delay: DEFAULT_RELAUNCH_DELAY,
            },
            watch: WatchSection {
                extensions: vec![DEFAULT_EXTENSION.to_string()],
                exclude: Vec::new(),
                reopen_delay: DEFAULT_REOPEN_DELAY,
            },
            toolchain: ToolchainSection::default(),
        }
    }
}
