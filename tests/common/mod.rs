#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use rerun::types::ProgramUnit;

pub use rerun_test_utils::builders::PackageBuilder;
pub use rerun_test_utils::fake_toolchain::{FakeToolchain, ToolchainCall};
pub use rerun_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A program unit whose "binary" is an arbitrary command on PATH.
pub fn command_unit(program: &str, args: &[&str]) -> ProgramUnit {
    ProgramUnit {
        import_path: format!("test/{program}"),
        bin_name: program.to_string(),
        bin_path: PathBuf::from(program),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

/// Poll `cond` every 20ms until it holds or 10 seconds pass.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}
