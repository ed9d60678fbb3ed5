//! Content-addressed artifact storage
//!
//! Compiled PDFs are persisted under names derived from the job id and
//! a hash of the exact markup that was compiled, so recompiling
//! identical input reuses the same name while changed input can never
//! be confused with a stale artifact.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::engine::ARTIFACT_EXT;
use crate::pipeline::PersistenceError;

/// Hex characters of the content hash carried in an artifact name
const HASH_PREFIX_LEN: usize = 8;

/// Store for compiled artifacts backed by a single directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the backing directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Get the backing directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the artifact produced by compiling `prepared` for
    /// `job_id`.
    ///
    /// Pure function of its inputs: the hash covers the exact prepared
    /// markup handed to the compiler.
    pub fn artifact_name(job_id: &str, prepared: &str) -> String {
        let digest = Sha256::digest(prepared.as_bytes());
        let hash = hex::encode(digest);
        format!("{job_id}_{}.{ARTIFACT_EXT}", &hash[..HASH_PREFIX_LEN])
    }

    /// Persist artifact bytes, publishing atomically via a rename so a
    /// concurrent reader never observes a partial file.
    #[instrument(skip(self, prepared, bytes))]
    pub async fn persist(
        &self,
        job_id: &str,
        prepared: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PersistenceError> {
        let name = Self::artifact_name(job_id, prepared);
        let path = self.dir.join(&name);
        let staging = self.dir.join(format!("{name}.tmp"));

        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|source| PersistenceError::WriteArtifact {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| PersistenceError::WriteArtifact {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), len = bytes.len(), "artifact persisted");
        Ok(path)
    }

    /// Check whether the artifact file is present on the backing store
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    /// Read artifact bytes back
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, PersistenceError> {
        tokio::fs::read(path)
            .await
            .map_err(|source| PersistenceError::ReadArtifact {
                path: path.to_path_buf(),
                source,
            })
    }
}
