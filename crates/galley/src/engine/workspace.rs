//! Scratch workspace allocation
//!
//! One compile attempt gets one uniquely named directory under the
//! scratch root. The directory is owned by the attempt and removed when
//! the workspace is dropped, on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, instrument};

use crate::engine::ProcessError;

/// An isolated scratch directory for one compile attempt.
///
/// Never shared across concurrent jobs; the unique suffix makes
/// concurrent allocations collision-free.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Allocate a fresh workspace under `scratch_root`.
    #[instrument]
    pub fn allocate(scratch_root: &Path) -> Result<Self, ProcessError> {
        std::fs::create_dir_all(scratch_root)?;
        let dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(scratch_root)?;

        debug!(path = %dir.path().display(), "workspace allocated");
        Ok(Self { dir })
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Get the host path of a file inside the workspace.
    ///
    /// Returns an error if the name contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, ProcessError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(ProcessError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.dir.path().join(name))
    }

    /// Write a file into the workspace
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<(), ProcessError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(())
    }

    /// Read a file from the workspace
    #[instrument(skip(self))]
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>, ProcessError> {
        let path = self.file_path(name)?;
        let content = tokio::fs::read(&path).await?;
        debug!(?path, len = content.len(), "read file from workspace");
        Ok(content)
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, ProcessError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }
}
