#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rerun::toolchain::{Package, PackageError};

/// Builder for `Package` metadata to simplify resolver setups.
pub struct PackageBuilder {
    package: Package,
}

impl PackageBuilder {
    /// A non-standard library package living under `/src/<import_path>`.
    pub fn new(import_path: &str) -> Self {
        let name = import_path.rsplit('/').next().unwrap_or(import_path).to_string();
        Self {
            package: Package {
                import_path: import_path.to_string(),
                dir: PathBuf::from("/src").join(import_path),
                name,
                ..Package::default()
            },
        }
    }

    /// A `package main` program.
    pub fn main(import_path: &str) -> Self {
        Self::new(import_path).name("main")
    }

    /// A standard-library package.
    pub fn std(import_path: &str) -> Self {
        let mut builder = Self::new(import_path);
        builder.package.dir = PathBuf::from("/goroot/src").join(import_path);
        builder.package.standard = true;
        builder.package.goroot = true;
        builder
    }

    pub fn name(mut self, name: &str) -> Self {
        self.package.name = name.to_string();
        self
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.package.dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn import(mut self, import_path: &str) -> Self {
        self.package.imports.push(import_path.to_string());
        self
    }

    pub fn target(mut self, target: impl AsRef<Path>) -> Self {
        self.package.target = Some(target.as_ref().to_path_buf());
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.package.error = Some(PackageError {
            err: message.to_string(),
        });
        self
    }

    pub fn build(self) -> Package {
        self.package
    }
}
