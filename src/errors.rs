// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cannot resolve program unit '{import_path}': {reason}")]
    Resolve { import_path: String, reason: String },

    #[error("expected package \"main\" for '{import_path}', got \"{name}\"")]
    NotExecutable { import_path: String, name: String },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RerunError {
    /// True for errors that end the whole run when they concern the root unit.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            RerunError::Resolve { .. } | RerunError::NotExecutable { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RerunError>;
