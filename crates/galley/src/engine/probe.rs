//! Toolchain availability probing
//!
//! Checks that the compiler binary is installed and responsive before a
//! compile request is accepted. Cheap enough for the hot path: one
//! short-lived child process per call, bounded by a small timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::engine::ToolchainError;

/// Cap on the version banner kept from the probe's stdout
const BANNER_LIMIT: usize = 80;

/// Cap on the stderr excerpt carried by an unhealthy probe result
const STDERR_LIMIT: usize = 100;

/// Identity of a responsive toolchain binary
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// The probed binary
    pub binary: PathBuf,

    /// First line of `--version` output
    pub banner: String,
}

/// Probe the compiler binary with a version flag.
///
/// Returns [`ToolchainError::NotFound`] when the binary is absent from
/// the execution path, [`ToolchainError::Timeout`] when the probe does
/// not return within `timeout`, and [`ToolchainError::Unhealthy`] on a
/// non-zero exit status.
#[instrument]
pub async fn probe(binary: &Path, timeout: Duration) -> Result<VersionInfo, ToolchainError> {
    let child = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Err(_) => return Err(ToolchainError::Timeout(timeout)),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolchainError::NotFound(binary.to_path_buf()));
        }
        Ok(Err(err)) => return Err(ToolchainError::Io(err)),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolchainError::Unhealthy {
            exit_code: output.status.code(),
            stderr: stderr.chars().take(STDERR_LIMIT).collect(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let banner: String = stdout
        .lines()
        .next()
        .unwrap_or("unknown")
        .chars()
        .take(BANNER_LIMIT)
        .collect();

    debug!(%banner, "toolchain responsive");

    Ok(VersionInfo {
        binary: binary.to_path_buf(),
        banner,
    })
}
