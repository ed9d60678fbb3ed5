//! External TeX toolchain driver
//!
//! This module wraps the compiler binary behind a Rust interface:
//! version probing, per-attempt scratch workspaces, command building
//! and the bounded multi-pass invocation loop.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use crate::engine::command::TexCommand;
pub use crate::engine::probe::{VersionInfo, probe};
pub use crate::engine::process::{ARTIFACT_EXT, CompileRequest, CompileRun, SOURCE_FILE, invoke};
pub use crate::engine::workspace::Workspace;

mod command;
mod probe;
mod process;
mod workspace;

/// Errors from the pre-flight toolchain probe
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("compiler '{}' not found in PATH", .0.display())]
    NotFound(PathBuf),

    #[error("version probe did not finish within {0:?}")]
    Timeout(Duration),

    #[error("compiler exited with status {exit_code:?}: {stderr}")]
    Unhealthy {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from one compile attempt's subprocess work
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn compiler: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("compiler pass did not finish within {0:?}")]
    Timeout(Duration),

    #[error("compiler exited with status {exit_code:?}: {excerpt}")]
    Failed {
        exit_code: Option<i32>,
        excerpt: String,
    },

    #[error("compiler reported success but no PDF was produced")]
    ArtifactMissing,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
