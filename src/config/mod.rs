// src/config/mod.rs

//! Configuration loading and validation.
//!
//! `rerun` is driven mostly by CLI flags; the optional TOML file only tunes
//! supervisor and watcher policies that have no dedicated flag.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, load_optional};
pub use model::{
    ConfigFile, RawConfigFile, RawSupervisorSection, RawWatchSection, SupervisorSection,
    ToolchainSection, WatchSection,
};
