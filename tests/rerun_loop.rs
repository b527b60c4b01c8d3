// tests/rerun_loop.rs
mod common;
use crate::common::{
    FakeToolchain, PackageBuilder, TestResult, ToolchainCall, command_unit, init_tracing,
    wait_until, with_timeout,
};

use std::fs;
use std::path::Path;
use std::time::Duration;

use rerun::engine::{CycleCore, CycleOptions, LoopOptions, RerunLoop};
use rerun::errors::Result as RerunResult;
use rerun::supervisor::SupervisorHandle;
use rerun::toolchain::BuildOutcome;
use rerun::types::{ProgramUnit, RestartRequest};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const APP: &str = "example.com/app";
const LIB: &str = "example.com/lib";

/// Time for the watcher session to settle after a rescan.
const SETTLE: Duration = Duration::from_millis(200);

struct Running {
    toolchain: FakeToolchain,
    restarts: mpsc::Receiver<RestartRequest>,
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<RerunResult<()>>,
    app: TempDir,
    lib: TempDir,
}

fn app_unit() -> ProgramUnit {
    ProgramUnit {
        import_path: APP.to_string(),
        ..command_unit("app", &[])
    }
}

/// A two-directory project: `app` (the main package) and `lib`, which
/// `app` imports only when `app_imports_lib` is set.
fn project(app_imports_lib: bool) -> std::io::Result<(FakeToolchain, TempDir, TempDir)> {
    let app = tempfile::tempdir()?;
    let lib = tempfile::tempdir()?;
    let toolchain = FakeToolchain::new()
        .with_package(app_package(app.path(), app_imports_lib))
        .with_package(PackageBuilder::new(LIB).dir(lib.path()).build());
    Ok((toolchain, app, lib))
}

fn app_package(dir: &Path, imports_lib: bool) -> rerun::toolchain::Package {
    let mut builder = PackageBuilder::main(APP).dir(dir).import("fmt");
    if imports_lib {
        builder = builder.import(LIB);
    }
    builder.build()
}

fn start(
    toolchain: FakeToolchain,
    app: TempDir,
    lib: TempDir,
    options: CycleOptions,
) -> Running {
    let (restart_tx, restarts) = mpsc::channel(16);
    let (shutdown, shutdown_rx) = mpsc::channel(1);

    let supervisor = (!options.never_run).then(|| SupervisorHandle::new(restart_tx));
    let rerun_loop = RerunLoop::new(
        toolchain.clone(),
        app_unit(),
        CycleCore::new(options),
        supervisor,
        LoopOptions {
            reopen_delay: Duration::from_millis(50),
            ..LoopOptions::default()
        },
    );
    let task = tokio::spawn(rerun_loop.run(shutdown_rx));

    Running {
        toolchain,
        restarts,
        shutdown,
        task,
        app,
        lib,
    }
}

impl Running {
    async fn next_restart(&mut self) -> RestartRequest {
        with_timeout(self.restarts.recv())
            .await
            .expect("restart channel closed")
    }

    /// Wait until the loop has (re)resolved the watch set `n` times in total
    /// and its watcher has had time to register.
    async fn watching(&self, n: usize) {
        let toolchain = self.toolchain.clone();
        wait_until(move || toolchain.import_count(APP) >= n).await;
        tokio::time::sleep(SETTLE).await;
    }

    async fn installs(&self, n: usize) {
        let toolchain = self.toolchain.clone();
        wait_until(move || toolchain.install_count() >= n).await;
    }

    fn touch_app(&self, name: &str) -> std::io::Result<()> {
        fs::write(self.app.path().join(name), "package main\n")
    }

    fn touch_lib(&self, name: &str) -> std::io::Result<()> {
        fs::write(self.lib.path().join(name), "package lib\n")
    }

    async fn shutdown(mut self) -> RerunResult<()> {
        self.shutdown.send(()).await.expect("loop gone before shutdown");
        let res = with_timeout(self.task).await.expect("loop task panicked");
        // Anything still queued plus the final stop.
        while let Ok(req) = self.restarts.try_recv() {
            if req == RestartRequest::Stop {
                return res;
            }
        }
        panic!("shutdown did not send a stop request");
    }
}

#[tokio::test]
async fn initial_pass_compiles_and_launches() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    assert_eq!(running.toolchain.phases(), vec![ToolchainCall::Install(APP.into())]);

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn source_change_rebuilds_and_relaunches() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    running.watching(1).await;

    running.touch_app("main.go")?;

    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    assert_eq!(running.toolchain.install_count(), 2);

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn irrelevant_files_do_not_trigger_rebuilds() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    running.next_restart().await;
    running.watching(1).await;

    running.touch_app("notes.txt")?;
    running.touch_app("go.sum.tmp")?;
    tokio::time::sleep(SETTLE * 2).await;

    assert_eq!(running.toolchain.install_count(), 1);
    assert!(running.restarts.try_recv().is_err());

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn new_import_is_watched_after_next_rebuild() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    running.next_restart().await;
    running.watching(1).await;

    // Not imported yet: lib changes are invisible.
    running.touch_lib("lib.go")?;
    tokio::time::sleep(SETTLE * 2).await;
    assert_eq!(running.toolchain.install_count(), 1);

    // The developer adds the import; the rescan picks up lib's directory.
    running
        .toolchain
        .set_package(app_package(running.app.path(), true));
    running.touch_app("main.go")?;
    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    running.watching(2).await;
    assert_eq!(running.toolchain.import_count(LIB), 1);

    running.touch_lib("lib.go")?;
    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    assert_eq!(running.toolchain.install_count(), 3);

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn compile_failure_keeps_old_instance() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    running.next_restart().await;
    running.watching(1).await;

    running
        .toolchain
        .push_install(BuildOutcome::failed("./main.go:4:2: undefined: y\n"));
    running.touch_app("main.go")?;
    running.installs(2).await;
    tokio::time::sleep(SETTLE).await;

    assert!(running.restarts.try_recv().is_err());

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn failing_tests_gate_the_restart() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    toolchain.push_test(BuildOutcome::failed("--- FAIL: TestHandler\n"));
    let mut running = start(
        toolchain,
        app,
        lib,
        CycleOptions {
            run_tests: true,
            ..CycleOptions::default()
        },
    );

    running.watching(1).await;
    assert!(running.restarts.try_recv().is_err(), "failing tests must not launch");

    running.touch_app("handler_test.go")?;
    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);

    assert_eq!(
        running.toolchain.phases(),
        vec![
            ToolchainCall::Install(APP.into()),
            ToolchainCall::Test(APP.into()),
            ToolchainCall::Install(APP.into()),
            ToolchainCall::Test(APP.into()),
        ]
    );

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn verification_build_runs_after_tests() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    toolchain.push_build(BuildOutcome::failed("cannot build\n"));
    let mut running = start(
        toolchain,
        app,
        lib,
        CycleOptions {
            run_tests: true,
            verify_build: true,
            never_run: false,
        },
    );

    // A failed verification build does not block the launch.
    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    assert_eq!(
        running.toolchain.phases(),
        vec![
            ToolchainCall::Install(APP.into()),
            ToolchainCall::Test(APP.into()),
            ToolchainCall::Build(APP.into()),
        ]
    );

    running.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn no_run_mode_never_requests_restarts() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(
        toolchain,
        app,
        lib,
        CycleOptions {
            never_run: true,
            ..CycleOptions::default()
        },
    );

    running.watching(1).await;
    running.touch_app("main.go")?;
    running.installs(2).await;
    tokio::time::sleep(SETTLE).await;
    assert!(running.restarts.try_recv().is_err());

    running.shutdown.send(()).await?;
    with_timeout(running.task).await??;
    Ok(())
}

#[tokio::test]
async fn unresolvable_root_stops_the_loop() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    toolchain.remove_package(APP);
    let running = start(toolchain, app, lib, CycleOptions::default());

    let err = with_timeout(running.task)
        .await?
        .expect_err("root resolution failure is fatal");
    assert!(err.is_resolution());
    Ok(())
}

#[tokio::test]
async fn root_vanishing_on_rescan_stops_the_loop() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    running.next_restart().await;
    running.watching(1).await;

    running.toolchain.remove_package(APP);
    running.touch_app("main.go")?;

    let err = with_timeout(running.task)
        .await?
        .expect_err("rescan resolution failure is fatal");
    assert!(err.is_resolution());
    Ok(())
}

#[tokio::test]
async fn shutdown_during_initial_build_returns_promptly() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    toolchain.delay_installs(Duration::from_secs(60));
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    running.installs(1).await;
    running.shutdown.send(()).await?;
    with_timeout(running.task).await??;

    assert_eq!(running.restarts.try_recv().ok(), Some(RestartRequest::Stop));
    assert!(running.restarts.try_recv().is_err(), "abandoned build must not relaunch");
    Ok(())
}

#[tokio::test]
async fn shutdown_during_rebuild_returns_promptly() -> TestResult {
    init_tracing();
    let (toolchain, app, lib) = project(false)?;
    let mut running = start(toolchain, app, lib, CycleOptions::default());

    assert_eq!(running.next_restart().await, RestartRequest::Relaunch);
    running.watching(1).await;

    running.toolchain.delay_installs(Duration::from_secs(60));
    running.touch_app("main.go")?;
    running.installs(2).await;

    running.shutdown.send(()).await?;
    with_timeout(running.task).await??;

    assert_eq!(running.restarts.try_recv().ok(), Some(RestartRequest::Stop));
    assert!(running.restarts.try_recv().is_err(), "abandoned build must not relaunch");
    Ok(())
}
