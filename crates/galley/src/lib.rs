//! A library for compiling untrusted markup documents to PDF.
//!
//! Galley drives an external TeX toolchain out-of-band from the request
//! path: markup is validated against a directive denylist, wrapped with
//! locale support, compiled in an isolated scratch workspace by a
//! bounded multi-pass invocation, and the resulting PDF is stored under
//! a content-derived name while a persisted status record tracks the
//! job from acceptance to its terminal state.
//!
//! # Features
//!
//! - **Denylist validation** — shell-escape and path-traversal directives are rejected before any subprocess runs.
//! - **Locale injection** — a Cyrillic-capable preamble is added exactly once; prepared markup is never re-wrapped.
//! - **Bounded invocation** — per-pass timeouts, halt-on-first-error, at most `max_passes` runs per attempt.
//! - **Content-addressed artifacts** — `{job}_{hash}.pdf` names keyed by the exact compiled markup.
//! - **Asynchronous status** — accept fast, compile in the background, poll a persisted state machine.

pub use config::{Config, ConfigError, DEFAULT_COMPILER, EXAMPLE_CONFIG};
pub use engine::{
    ARTIFACT_EXT, CompileRequest, CompileRun, ProcessError, SOURCE_FILE, TexCommand,
    ToolchainError, VersionInfo, Workspace, invoke, probe,
};
pub use pipeline::{
    ArtifactStore, JobStore, MemoryJobStore, PersistenceError, Pipeline, RetrieveError,
    StatusTracker, SubmitError, SubmitReceipt, ValidationError, WaitError, prepare, validate,
};
pub use types::{JobRecord, JobStatus, MAX_LOG_CHARS, StatusReport};

pub mod config;
pub mod engine;
pub mod pipeline;
pub mod types;
