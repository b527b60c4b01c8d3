// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, DEFAULT_RELAUNCH_DELAY, DEFAULT_REOPEN_DELAY, DEFAULT_EXTENSION, RawConfigFile,
    SupervisorSection, WatchSection,
};
use crate::errors::{RerunError, Result};
use crate::watch::EventFilter;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RerunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let supervisor = SupervisorSection {
            stop_timeout: raw
                .supervisor
                .stop_timeout
                .as_deref()
                .map(|s| duration_field("supervisor.stop_timeout", s))
                .transpose()?,
            relaunch_delay: optional_duration(
                "supervisor.relaunch_delay",
                raw.supervisor.relaunch_delay.as_deref(),
                DEFAULT_RELAUNCH_DELAY,
            )?,
        };

        let extensions = normalize_extensions(raw.watch.extensions)?;

        let watch = WatchSection {
            extensions,
            exclude: raw.watch.exclude,
            reopen_delay: optional_duration(
                "watch.reopen_delay",
                raw.watch.reopen_delay.as_deref(),
                DEFAULT_REOPEN_DELAY,
            )?,
        };

        // Surface bad globs at startup rather than on the first session.
        EventFilter::new(&watch.extensions, &watch.exclude)?;

        if raw.toolchain.go.trim().is_empty() {
            return Err(RerunError::ConfigError(
                "[toolchain].go must not be empty".to_string(),
            ));
        }

        Ok(ConfigFile {
            supervisor,
            watch,
            toolchain: raw.toolchain,
        })
    }
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| RerunError::ConfigError(format!("[{field}]: {e}")))
}

fn optional_duration(field: &str, value: Option<&str>, default: Duration) -> Result<Duration> {
    match value {
        Some(v) => duration_field(field, v),
        None => Ok(default),
    }
}

/// Strip leading dots and reject an explicitly empty list.
fn normalize_extensions(raw: Option<Vec<String>>) -> Result<Vec<String>> {
    let Some(list) = raw else {
        return Ok(vec![DEFAULT_EXTENSION.to_string()]);
    };

    let normalized: Vec<String> = list
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(RerunError::ConfigError(
            "[watch].extensions must name at least one source extension".to_string(),
        ));
    }

    Ok(normalized)
}
