// src/toolchain/mod.rs

//! Compiler gateway.
//!
//! The rest of the crate never spawns `go` directly; it talks to a
//! [`Toolchain`]. Production code uses [`GoToolchain`]; tests provide a
//! scripted implementation that records calls instead of compiling.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::ProgramUnit;

pub mod go;
pub mod package;

pub use go::{GoToolchain, ToolchainOptions};
pub use package::{Package, PackageError};

/// Boxed future returned by [`Toolchain`] methods.
pub type ToolchainFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of one toolchain invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    /// Combined stdout/stderr of the command, in arrival order.
    pub diagnostics: String,
    /// Set on a failed compile whose diagnostics equal the previous failure's.
    pub repeated: bool,
}

impl BuildOutcome {
    pub fn passed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostics: diagnostics.into(),
            repeated: false,
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
            repeated: false,
        }
    }

    /// A failed outcome describing why the toolchain could not be invoked.
    pub fn from_error(err: &crate::errors::RerunError) -> Self {
        Self::failed(format!("{err}\n"))
    }

    /// True if the command produced no output at all.
    pub fn is_silent(&self) -> bool {
        self.diagnostics.trim().is_empty()
    }
}

/// Everything `rerun` needs from the language toolchain.
pub trait Toolchain: Send + Sync {
    /// Look up package metadata for an import path.
    fn import<'a>(&'a self, import_path: &'a str) -> ToolchainFuture<'a, Package>;

    /// Fetch, compile and install the runnable binary.
    fn install<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome>;

    /// Run the unit's tests.
    fn test<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome>;

    /// Verification build, independent of `install`.
    fn build<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome>;
}
