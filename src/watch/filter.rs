// src/watch/filter.rs

use std::fmt;
use std::path::Path;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;

/// Decides which changed paths count as relevant.
///
/// A path is relevant when its extension is one of the source extensions and
/// neither the full path nor the file name matches an exclude glob.
#[derive(Clone)]
pub struct EventFilter {
    extensions: Vec<String>,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("extensions", &self.extensions)
            .field("has_exclude", &self.exclude.is_some())
            .finish()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::go_sources()
    }
}

impl EventFilter {
    pub fn new(extensions: &[String], exclude: &[String]) -> Result<Self> {
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            exclude,
        })
    }

    /// Only `.go` files, nothing excluded.
    pub fn go_sources() -> Self {
        Self {
            extensions: vec!["go".to_string()],
            exclude: None,
        }
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|wanted| wanted == ext) {
            return false;
        }
        if path.is_dir() {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            let by_name = path
                .file_name()
                .map(|name| exclude.is_match(Path::new(name)))
                .unwrap_or(false);
            if by_name || exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building exclude globset")?)
}
