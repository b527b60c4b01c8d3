// src/toolchain/package.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Package metadata as reported by `go list -json`.
///
/// Only the fields the resolver needs are kept; everything else in the JSON
/// is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub import_path: String,
    #[serde(default)]
    pub dir: PathBuf,
    #[serde(default)]
    pub name: String,
    /// Part of the standard library.
    #[serde(default)]
    pub standard: bool,
    /// Lives under GOROOT (older toolchains set this instead of `Standard`).
    #[serde(default)]
    pub goroot: bool,
    #[serde(default)]
    pub imports: Vec<String>,
    /// Install location of the binary, for main packages.
    #[serde(default)]
    pub target: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<PackageError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageError {
    #[serde(rename = "Err", default)]
    pub err: String,
}

impl Package {
    /// Provided by the platform distribution; never watched or expanded.
    pub fn is_platform(&self) -> bool {
        self.standard || self.goroot
    }

    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    /// Why this package cannot be used, if it cannot.
    ///
    /// `go list -e` reports missing packages with an `Error` and either no
    /// directory or a directory that does not exist.
    pub fn unresolved_reason(&self) -> Option<String> {
        let missing_dir = self.dir.as_os_str().is_empty()
            || (self.error.is_some() && !self.dir.is_dir());
        if !missing_dir {
            return None;
        }
        Some(
            self.error
                .as_ref()
                .map(|e| e.err.clone())
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "package has no source directory".to_string()),
        )
    }
}
