// src/toolchain/go.rs

//! [`Toolchain`] backed by the `go` command.

use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{RerunError, Result};
use crate::toolchain::{BuildOutcome, Package, Toolchain, ToolchainFuture};
use crate::types::ProgramUnit;

/// Flags shared by every toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainOptions {
    /// Name or path of the `go` executable.
    pub go_binary: String,
    /// Pass `-race` to install, test and build.
    pub race: bool,
    /// `-tags` for the verification build only.
    pub build_tags: Option<String>,
}

impl Default for ToolchainOptions {
    fn default() -> Self {
        Self {
            go_binary: "go".to_string(),
            race: false,
            build_tags: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoToolchain {
    options: ToolchainOptions,
}

impl GoToolchain {
    pub fn new(options: ToolchainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ToolchainOptions {
        &self.options
    }

    /// `go install [-race] <path>`
    pub fn install_args(&self, import_path: &str) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if self.options.race {
            args.push("-race".to_string());
        }
        args.push(import_path.to_string());
        args
    }

    /// `go test [-race] -v <path>`
    pub fn test_args(&self, import_path: &str) -> Vec<String> {
        let mut args = vec!["test".to_string()];
        if self.options.race {
            args.push("-race".to_string());
        }
        args.push("-v".to_string());
        args.push(import_path.to_string());
        args
    }

    /// `go build [-tags <tags>] [-race] -v <path>`
    pub fn build_args(&self, import_path: &str) -> Vec<String> {
        let mut args = vec!["build".to_string()];
        if let Some(tags) = self.options.build_tags.as_deref().filter(|t| !t.is_empty()) {
            args.push("-tags".to_string());
            args.push(tags.to_string());
        }
        if self.options.race {
            args.push("-race".to_string());
        }
        args.push("-v".to_string());
        args.push(import_path.to_string());
        args
    }

    /// Run `go <args>` to completion, capturing stdout and stderr together.
    async fn run_captured(&self, args: Vec<String>) -> Result<BuildOutcome> {
        let go = &self.options.go_binary;
        debug!(%go, ?args, "running toolchain command");

        let mut child = Command::new(go)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning `{} {}`", go, args.join(" ")))?;

        let stdout = child.stdout.take().context("toolchain stdout was not piped")?;
        let stderr = child.stderr.take().context("toolchain stderr was not piped")?;
        let diagnostics = collect_combined(stdout, stderr).await;

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for `{} {}`", go, args.join(" ")))?;

        debug!(%go, ?args, success = status.success(), "toolchain command finished");
        Ok(BuildOutcome {
            success: status.success(),
            diagnostics,
            repeated: false,
        })
    }

    /// `go list -e -json <path>`
    async fn list(&self, import_path: &str) -> Result<Package> {
        let go = &self.options.go_binary;
        let output = Command::new(go)
            .args(["list", "-e", "-json", import_path])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawning `{go} list` for {import_path}"))?;

        if output.stdout.is_empty() {
            return Err(RerunError::Resolve {
                import_path: import_path.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let package: Package = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing `{go} list -json` output for {import_path}"))?;

        if let Some(reason) = package.unresolved_reason() {
            return Err(RerunError::Resolve {
                import_path: import_path.to_string(),
                reason,
            });
        }

        Ok(package)
    }
}

impl Toolchain for GoToolchain {
    fn import<'a>(&'a self, import_path: &'a str) -> ToolchainFuture<'a, Package> {
        Box::pin(self.list(import_path))
    }

    fn install<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            info!(import_path = %unit.import_path, "installing");
            self.run_captured(self.install_args(&unit.import_path)).await
        })
    }

    fn test<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            info!(import_path = %unit.import_path, "testing");
            self.run_captured(self.test_args(&unit.import_path)).await
        })
    }

    fn build<'a>(&'a self, unit: &'a ProgramUnit) -> ToolchainFuture<'a, BuildOutcome> {
        Box::pin(async move {
            info!(import_path = %unit.import_path, "verification build");
            self.run_captured(self.build_args(&unit.import_path)).await
        })
    }
}

/// Interleave two byte streams into one string, line by line, in the order
/// lines arrive.
///
/// Invalid UTF-8 is replaced rather than treated as the end of the stream,
/// and both pipes are drained until EOF so the child never blocks on a full
/// pipe.
async fn collect_combined<O, E>(stdout: O, stderr: E) -> String
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    // Partial lines survive a lost select race; `read_until` appends.
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut combined = String::new();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            res = out.read_until(b'\n', &mut out_buf), if out_open => {
                out_open = take_line(res, &mut out_buf, &mut combined, "stdout");
            }
            res = err.read_until(b'\n', &mut err_buf), if err_open => {
                err_open = take_line(res, &mut err_buf, &mut combined, "stderr");
            }
        }
    }

    combined
}

/// Move one completed read into `combined`. Returns whether the stream is
/// still open.
fn take_line(
    res: std::io::Result<usize>,
    buf: &mut Vec<u8>,
    combined: &mut String,
    stream: &str,
) -> bool {
    let open = match res {
        Ok(0) => false,
        Ok(_) => true,
        Err(err) => {
            warn!(stream, error = %err, "reading toolchain output failed");
            false
        }
    };

    if !buf.is_empty() {
        combined.push_str(&String::from_utf8_lossy(buf));
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
        buf.clear();
    }

    open
}
