//! Shared helpers for `rerun` integration tests.
//!
//! - [`fake_toolchain::FakeToolchain`]: scripted compiler gateway.
//! - [`builders::PackageBuilder`]: terse package metadata for resolver graphs.

pub mod builders;
pub mod fake_toolchain;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use rerun::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Filter comes from `RUST_LOG`, then `RERUN_LOG`, then `info`. Output is
/// only shown for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_from_env(LOG_ENV_VAR))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step timed out after {TEST_TIMEOUT:?}"),
    }
}
