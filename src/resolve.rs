// src/resolve.rs

//! Dependency watch-set resolution.
//!
//! Starting from the main package, walk its imports with an explicit
//! worklist and collect the source directory of every package that is not
//! part of the Go distribution. Those directories are what the watcher
//! session registers.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{RerunError, Result};
use crate::toolchain::Toolchain;
use crate::types::ProgramUnit;

/// Pseudo-import used by cgo; never a real package.
const CGO_PSEUDO_IMPORT: &str = "C";

/// Directories to watch plus the import paths examined to find them.
///
/// Always rebuilt from scratch; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    dirs: BTreeSet<PathBuf>,
    visited: BTreeSet<String>,
}

impl WatchSet {
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn contains_dir(&self, dir: impl AsRef<Path>) -> bool {
        self.dirs.contains(dir.as_ref())
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Resolve the main package into a [`ProgramUnit`].
///
/// Fails if the package cannot be found or is not `package main`.
/// `bin_dir_override` is the `GOBIN`-style directory to launch from; without
/// it the toolchain's install target is used.
pub async fn resolve_program_unit<T>(
    toolchain: &T,
    import_path: &str,
    args: Vec<String>,
    bin_dir_override: Option<&Path>,
) -> Result<ProgramUnit>
where
    T: Toolchain + ?Sized,
{
    let package = toolchain.import(import_path).await?;

    if !package.is_main() {
        return Err(RerunError::NotExecutable {
            import_path: import_path.to_string(),
            name: package.name,
        });
    }

    let canonical_path = if package.import_path.is_empty() {
        import_path
    } else {
        package.import_path.as_str()
    };
    let bin_name = ProgramUnit::bin_name_for(canonical_path);

    let bin_path = match bin_dir_override {
        Some(dir) => dir.join(&bin_name),
        None => package
            .target
            .clone()
            .filter(|t| !t.as_os_str().is_empty())
            .unwrap_or_else(|| package.dir.join(&bin_name)),
    };

    info!(%import_path, bin = ?bin_path, "resolved program unit");

    Ok(ProgramUnit {
        import_path: import_path.to_string(),
        bin_name,
        bin_path,
        args,
    })
}

/// Compute the set of directories whose changes affect `root`.
///
/// - Platform packages are neither watched nor expanded.
/// - An import that cannot be resolved drops only its own branch.
/// - Failure to resolve `root` itself is returned as an error.
pub async fn resolve_watch_set<T>(toolchain: &T, root: &str) -> Result<WatchSet>
where
    T: Toolchain + ?Sized,
{
    let mut set = WatchSet::default();
    let mut worklist = VecDeque::from([root.to_string()]);
    set.visited.insert(root.to_string());

    while let Some(import_path) = worklist.pop_front() {
        let package = match toolchain.import(&import_path).await {
            Ok(package) => package,
            Err(err) if import_path == root => return Err(err),
            Err(err) => {
                debug!(%import_path, error = %err, "skipping unresolvable import");
                continue;
            }
        };

        if package.is_platform() {
            continue;
        }

        set.dirs.insert(package.dir.clone());

        for import in &package.imports {
            if import == CGO_PSEUDO_IMPORT || set.visited.contains(import) {
                continue;
            }
            set.visited.insert(import.clone());
            worklist.push_back(import.clone());
        }
    }

    debug!(
        %root,
        dirs = set.dirs.len(),
        visited = set.visited.len(),
        "resolved watch set"
    );
    Ok(set)
}
