//! Job status tracking
//!
//! The persisted state machine for compile jobs:
//! `not_compiled -> compiling -> success | error`, with terminal states
//! restartable by a fresh attempt.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::pipeline::PersistenceError;
use crate::types::{JobRecord, JobStatus, MAX_LOG_CHARS, truncate_chars};

/// Persistence seam for job records.
///
/// The host application decides where records live; [`MemoryJobStore`]
/// ships as the in-process implementation.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Load the record for `job_id`; a pristine record if none exists
    async fn load(&self, job_id: &str) -> Result<JobRecord, PersistenceError>;

    /// Store the record for `job_id`, replacing any prior one
    async fn store(&self, job_id: &str, record: JobRecord) -> Result<(), PersistenceError>;
}

/// In-memory job store
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn load(&self, job_id: &str) -> Result<JobRecord, PersistenceError> {
        Ok(self
            .records
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn store(&self, job_id: &str, record: JobRecord) -> Result<(), PersistenceError> {
        self.records.write().await.insert(job_id.to_owned(), record);
        Ok(())
    }
}

/// Owns the status transitions. Each job's record is written only by
/// that job's own pipeline, so transitions need no cross-job locking.
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn JobStore>,
}

impl StatusTracker {
    /// Create a tracker over the given store
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Commit `compiling` for a fresh attempt.
    ///
    /// Must land before the background work starts so a caller polling
    /// right after acceptance never observes the prior state. The prior
    /// artifact reference and log survive until the attempt reaches a
    /// terminal state.
    #[instrument(skip(self))]
    pub async fn mark_compiling(&self, job_id: &str) -> Result<(), PersistenceError> {
        let mut record = self.store.load(job_id).await?;
        record.status = JobStatus::Compiling;
        self.store.store(job_id, record).await
    }

    /// Terminal success: status, artifact reference and completion
    /// timestamp land in a single store write.
    #[instrument(skip(self, log))]
    pub async fn mark_success(
        &self,
        job_id: &str,
        artifact_path: PathBuf,
        log: String,
    ) -> Result<(), PersistenceError> {
        let mut record = self.store.load(job_id).await?;
        record.status = JobStatus::Success;
        record.artifact_path = Some(artifact_path);
        record.completed_at = Some(OffsetDateTime::now_utc());
        record.log = Some(truncate_chars(&log, MAX_LOG_CHARS));
        self.store.store(job_id, record).await
    }

    /// Terminal failure: log attached, artifact reference left as-is.
    #[instrument(skip(self, log))]
    pub async fn mark_error(&self, job_id: &str, log: String) -> Result<(), PersistenceError> {
        let mut record = self.store.load(job_id).await?;
        record.status = JobStatus::Error;
        record.log = Some(truncate_chars(&log, MAX_LOG_CHARS));
        self.store.store(job_id, record).await
    }

    /// Current record for `job_id`
    pub async fn snapshot(&self, job_id: &str) -> Result<JobRecord, PersistenceError> {
        self.store.load(job_id).await
    }
}
