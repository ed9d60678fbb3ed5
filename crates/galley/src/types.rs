use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum number of characters preserved in a job's compile log.
/// Excess output is discarded, not summarized.
pub const MAX_LOG_CHARS: usize = 5000;

/// Compilation status of a job.
///
/// Transitions are monotonic within one attempt:
/// `NotCompiled -> Compiling -> Success | Error`. A terminal state may
/// move back to `Compiling` when a fresh attempt is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No compile has been requested yet
    #[default]
    NotCompiled,

    /// An attempt has been accepted and is running in the background
    Compiling,

    /// The last attempt produced an artifact
    Success,

    /// The last attempt failed; see the record's log
    Error,
}

impl JobStatus {
    /// Check whether the status ends an attempt
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Wire representation used by stores and query surfaces
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotCompiled => "not_compiled",
            JobStatus::Compiling => "compiling",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record for one compile job.
///
/// Mutated only through the status tracker's transition methods; a job
/// that was never submitted is represented by the default record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobRecord {
    /// Current state-machine position
    pub status: JobStatus,

    /// Captured compiler output, capped at [`MAX_LOG_CHARS`] characters
    pub log: Option<String>,

    /// Path of the persisted artifact; overwritten only on success
    pub artifact_path: Option<PathBuf>,

    /// When the last successful attempt finished
    pub completed_at: Option<OffsetDateTime>,
}

/// Point-in-time answer to a status query.
///
/// `artifact_exists` is computed against the backing store when the
/// query runs, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    pub artifact_exists: bool,
    pub artifact_path: Option<PathBuf>,
    pub completed_at: Option<OffsetDateTime>,
}

/// Truncate `text` to at most `limit` characters, respecting UTF-8
/// boundaries.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((offset, _)) => text[..offset].to_owned(),
        None => text.to_owned(),
    }
}
