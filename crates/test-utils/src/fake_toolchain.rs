use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rerun::errors::RerunError;
use rerun::toolchain::{BuildOutcome, Package, Toolchain, ToolchainFuture};
use rerun::types::ProgramUnit;

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
    Import(String),
    Install(String),
    Test(String),
    Build(String),
}

#[derive(Default)]
struct FakeState {
    packages: HashMap<String, Package>,
    install: VecDeque<BuildOutcome>,
    test: VecDeque<BuildOutcome>,
    build: VecDeque<BuildOutcome>,
    calls: Vec<ToolchainCall>,
    install_delay: Option<Duration>,
}

/// A scripted toolchain that:
/// - answers `import` from an in-memory package graph (mutable mid-test)
/// - returns queued outcomes for install/test/build (success when empty)
/// - records every call.
///
/// Clones share state, so a test can keep one clone for inspection while the
/// loop owns another.
#[derive(Clone, Default)]
pub struct FakeToolchain {
    state: Arc<Mutex<FakeState>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(self, package: Package) -> Self {
        self.set_package(package);
        self
    }

    pub fn with_packages(self, packages: impl IntoIterator<Item = Package>) -> Self {
        for package in packages {
            self.set_package(package);
        }
        self
    }

    /// Add or replace a package; later resolutions see the new graph.
    pub fn set_package(&self, package: Package) {
        let mut state = self.state.lock().unwrap();
        state.packages.insert(package.import_path.clone(), package);
    }

    pub fn remove_package(&self, import_path: &str) {
        self.state.lock().unwrap().packages.remove(import_path);
    }

    pub fn push_install(&self, outcome: BuildOutcome) {
        self.state.lock().unwrap().install.push_back(outcome);
    }

    /// Make every later `install` take `delay` before answering, like a slow
    /// compile.
    pub fn delay_installs(&self, delay: Duration) {
        self.state.lock().unwrap().install_delay = Some(delay);
    }

    pub fn push_test(&self, outcome: BuildOutcome) {
        self.state.lock().unwrap().test.push_back(outcome);
    }

    pub fn push_build(&self, outcome: BuildOutcome) {
        self.state.lock().unwrap().build.push_back(outcome);
    }

    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn install_count(&self) -> usize {
        self.count(|c| matches!(c, ToolchainCall::Install(_)))
    }

    pub fn test_count(&self) -> usize {
        self.count(|c| matches!(c, ToolchainCall::Test(_)))
    }

    pub fn build_count(&self) -> usize {
        self.count(|c| matches!(c, ToolchainCall::Build(_)))
    }

    pub fn import_count(&self, import_path: &str) -> usize {
        self.count(|c| matches!(c, ToolchainCall::Import(p) if p == import_path))
    }

    /// Calls other than `Import`, in order.
    pub fn phases(&self) -> Vec<ToolchainCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, ToolchainCall::Import(_)))
            .collect()
    }

    fn count(&self, pred: impl Fn(&ToolchainCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ToolchainCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_outcome(&self, pick: impl FnOnce(&mut FakeState) -> Option<BuildOutcome>) -> BuildOutcome {
        let mut state = self.state.lock().unwrap();
        pick(&mut state).unwrap_or_else(|| BuildOutcome::passed(""))
    }
}

impl Toolchain for FakeToolchain {
    fn import<'a>(&'a self, import_path: &'a str) -> ToolchainFuture<'a, Package> {
        Box::pin(async move {
            self.record(ToolchainCall::Import(import_path.to_string()));
            let state = self.state.lock().unwrap();
            state
                .packages
                .get(import_path)
                .cloned()
                .ok_or_else(|| RerunError::Resolve {
                    import_path: import_path.to_string(),
                    reason: "cannot find package".to_string(),
                })
        })
    }

    fn install<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            self.record(ToolchainCall::Install(unit.import_path.clone()));
            let delay = self.state.lock().unwrap().install_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.next_outcome(|s| s.install.pop_front()))
        })
    }

    fn test<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            self.record(ToolchainCall::Test(unit.import_path.clone()));
            Ok(self.next_outcome(|s| s.test.pop_front()))
        })
    }

    fn build<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            self.record(ToolchainCall::Build(unit.import_path.clone()));
            Ok(self.next_outcome(|s| s.build.pop_front()))
        })
    }
}
