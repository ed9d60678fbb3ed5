//! Background dispatch of compile attempts
//!
//! Decouples the accept path from the multi-second compilation work.
//! Validation and toolchain probing run synchronously at submission;
//! everything after acceptance runs in a spawned task whose failures
//! surface only through the status record, never through the caller.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{error, info, instrument, warn};

use crate::engine::{CompileRequest, VersionInfo, Workspace, invoke, probe};
use crate::pipeline::{Pipeline, SubmitError, WaitError, prepare, validate};
use crate::types::JobRecord;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Acknowledgment returned once a submission is accepted
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: String,

    /// Toolchain identity from the pre-flight probe
    pub toolchain: VersionInfo,
}

/// Job ids with an attempt currently in flight.
///
/// A second submission for a claimed id is rejected instead of racing
/// the first attempt's terminal status write.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClaimSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl ClaimSet {
    /// Claim `job_id` for one attempt; `None` if already claimed
    fn claim(&self, job_id: &str) -> Option<Claim> {
        let mut held = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(job_id.to_owned()) {
            return None;
        }
        Some(Claim {
            set: Arc::clone(&self.inner),
            job_id: job_id.to_owned(),
        })
    }
}

/// Exclusive per-job claim, released on every exit path of an attempt
#[derive(Debug)]
struct Claim {
    set: Arc<Mutex<HashSet<String>>>,
    job_id: String,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.job_id);
    }
}

/// Accept a compile job and dispatch the work.
///
/// Fails synchronously, touching no job record, when validation or the
/// toolchain probe fails or when an attempt for the same id is already
/// in flight. On acceptance the `compiling` status is committed before
/// the task is spawned.
#[instrument(skip(pipeline, markup), fields(markup_len = markup.len()))]
pub(crate) async fn submit(
    pipeline: &Pipeline,
    job_id: &str,
    markup: String,
) -> Result<SubmitReceipt, SubmitError> {
    validate(&markup)?;

    let config = pipeline.config();
    let toolchain = probe(&config.compiler_binary(), config.probe_timeout()).await?;

    let Some(claim) = pipeline.claims().claim(job_id) else {
        return Err(SubmitError::AlreadyCompiling(job_id.to_owned()));
    };

    pipeline.tracker().mark_compiling(job_id).await?;
    info!(job_id, banner = %toolchain.banner, "compile job accepted");

    let task_pipeline = pipeline.clone();
    let task_job_id = job_id.to_owned();
    tokio::spawn(async move {
        let _claim = claim;
        run_attempt(&task_pipeline, &task_job_id, &markup).await;
    });

    Ok(SubmitReceipt {
        job_id: job_id.to_owned(),
        toolchain,
    })
}

/// One decoupled compile attempt.
///
/// Converts every failure into an `error` status transition; nothing
/// escapes the task.
async fn run_attempt(pipeline: &Pipeline, job_id: &str, markup: &str) {
    let config = pipeline.config();
    let prepared = prepare(markup);

    let workspace = match Workspace::allocate(&config.scratch_root()) {
        Ok(workspace) => workspace,
        Err(err) => {
            record_error(
                pipeline,
                job_id,
                format!("failed to allocate workspace: {err}"),
            )
            .await;
            return;
        }
    };

    let compiler = config.compiler_binary();
    let run = invoke(CompileRequest {
        workspace: &workspace,
        source: &prepared,
        compiler: &compiler,
        max_passes: config.max_passes,
        pass_timeout: config.pass_timeout(),
    })
    .await;

    match run.result {
        Ok(pdf) => match pipeline.artifacts().persist(job_id, &prepared, &pdf).await {
            Ok(path) => match pipeline.tracker().mark_success(job_id, path, run.log).await {
                Ok(()) => info!(job_id, passes = run.passes, "compile succeeded"),
                Err(err) => {
                    warn!(job_id, error = %err, "failed to record success status");
                    record_error(
                        pipeline,
                        job_id,
                        format!("compile succeeded but the status write failed: {err}"),
                    )
                    .await;
                }
            },
            Err(err) => {
                record_error(
                    pipeline,
                    job_id,
                    format!("{}\nfailed to persist artifact: {err}", run.log),
                )
                .await;
            }
        },
        Err(err) => {
            record_error(pipeline, job_id, format!("{}\n{err}", run.log)).await;
        }
    }
}

/// Best-effort terminal `error` write: retried once, then only logged.
/// A job left in `compiling` after both attempts must be reconciled by
/// the host application.
async fn record_error(pipeline: &Pipeline, job_id: &str, log: String) {
    if let Err(first) = pipeline.tracker().mark_error(job_id, log.clone()).await {
        warn!(job_id, error = %first, "failed to record error status, retrying");
        if let Err(second) = pipeline.tracker().mark_error(job_id, log).await {
            error!(job_id, error = %second, "failed to record error status; job left in compiling state");
        }
    }
}

/// Block until the job reaches a terminal state or the timeout elapses
pub(crate) async fn wait_for_completion(
    pipeline: &Pipeline,
    job_id: &str,
    timeout: Duration,
) -> Result<JobRecord, WaitError> {
    let deadline = Instant::now() + timeout;

    loop {
        let record = pipeline.tracker().snapshot(job_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout(job_id.to_owned(), timeout));
        }

        sleep(WAIT_POLL_INTERVAL).await;
    }
}
