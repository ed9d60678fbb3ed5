//! Document compilation pipeline
//!
//! High-level API tying validation, preprocessing, toolchain probing,
//! workspace allocation, process invocation, artifact storage and
//! status tracking together behind a single type.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use crate::pipeline::artifact::ArtifactStore;
pub use crate::pipeline::dispatch::SubmitReceipt;
pub use crate::pipeline::prepare::prepare;
pub use crate::pipeline::status::{JobStore, MemoryJobStore, StatusTracker};
pub use crate::pipeline::validate::{ValidationError, validate};

mod artifact;
mod dispatch;
mod prepare;
mod status;
mod validate;

use crate::config::Config;
use crate::engine::{self, ToolchainError, VersionInfo};
use crate::types::{JobRecord, JobStatus, StatusReport};

/// Errors persisting job records or artifacts
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact {path}: {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("status store error: {0}")]
    Store(String),
}

impl PersistenceError {
    /// Wrap an external store's failure
    pub fn from_store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}

/// Synchronous rejection of a compile submission.
///
/// Whenever `submit` returns one of these, no job record was touched
/// and no subprocess pipeline was started.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("a compile attempt for job `{0}` is already running")]
    AlreadyCompiling(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Failure to hand out a compiled artifact
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("no compiled artifact for job `{0}`")]
    NotFound(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Failure while waiting for a job to finish
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("job `{0}` did not reach a terminal state within {1:?}")]
    Timeout(String, Duration),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// High-level compilation pipeline
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    tracker: StatusTracker,
    artifacts: ArtifactStore,
    claims: dispatch::ClaimSet,
}

impl Pipeline {
    /// Create a pipeline over the given job store
    pub fn new(config: Config, store: Arc<dyn JobStore>) -> Result<Self, PersistenceError> {
        let artifacts = ArtifactStore::new(&config.artifact_dir)?;
        Ok(Self {
            config,
            tracker: StatusTracker::new(store),
            artifacts,
            claims: dispatch::ClaimSet::default(),
        })
    }

    /// Create a pipeline backed by an in-memory job store
    pub fn with_memory_store(config: Config) -> Result<Self, PersistenceError> {
        Self::new(config, Arc::new(MemoryJobStore::new()))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub(crate) fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub(crate) fn claims(&self) -> &dispatch::ClaimSet {
        &self.claims
    }

    /// Probe the configured toolchain
    pub async fn probe_toolchain(&self) -> Result<VersionInfo, ToolchainError> {
        engine::probe(&self.config.compiler_binary(), self.config.probe_timeout()).await
    }

    /// Accept a compile job.
    ///
    /// Returns as soon as validation and the toolchain probe succeed;
    /// the compilation itself runs decoupled from the caller and its
    /// outcome is visible only through [`status`](Self::status) and
    /// [`retrieve`](Self::retrieve). Exactly one attempt runs per
    /// accepted submission; a second submission for an id with an
    /// attempt in flight is rejected.
    pub async fn submit(&self, job_id: &str, markup: String) -> Result<SubmitReceipt, SubmitError> {
        dispatch::submit(self, job_id, markup).await
    }

    /// Current status of a job.
    ///
    /// Artifact existence is checked against the backing store at query
    /// time, not cached.
    pub async fn status(&self, job_id: &str) -> Result<StatusReport, PersistenceError> {
        let record = self.tracker.snapshot(job_id).await?;
        let artifact_exists = match record.artifact_path {
            Some(ref path) => self.artifacts.exists(path).await,
            None => false,
        };

        Ok(StatusReport {
            status: record.status,
            artifact_exists,
            artifact_path: record.artifact_path,
            completed_at: record.completed_at,
        })
    }

    /// Artifact bytes for a successfully compiled job.
    ///
    /// Not found unless the job's status is `success` and the artifact
    /// file is still present on the backing store.
    pub async fn retrieve(&self, job_id: &str) -> Result<Vec<u8>, RetrieveError> {
        let record = self.tracker.snapshot(job_id).await?;
        if record.status != JobStatus::Success {
            return Err(RetrieveError::NotFound(job_id.to_owned()));
        }

        let Some(path) = record.artifact_path else {
            return Err(RetrieveError::NotFound(job_id.to_owned()));
        };
        if !self.artifacts.exists(&path).await {
            return Err(RetrieveError::NotFound(job_id.to_owned()));
        }

        Ok(self.artifacts.read(&path).await?)
    }

    /// Block until the job reaches a terminal state or the timeout
    /// elapses, returning the final record
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<JobRecord, WaitError> {
        dispatch::wait_for_completion(self, job_id, timeout).await
    }
}
