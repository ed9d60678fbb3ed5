//! Multi-pass compiler invocation
//!
//! Runs the toolchain against a prepared workspace, bounded per pass,
//! captures a filtered log and locates the produced PDF.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::engine::{ProcessError, TexCommand, Workspace};

/// Conventional name of the source file written into the workspace
pub const SOURCE_FILE: &str = "document.tex";

/// Extension of the produced artifact
pub const ARTIFACT_EXT: &str = "pdf";

/// Cap on a single kept log line
const LINE_LIMIT: usize = 200;

/// Cap on the failure excerpt carried in [`ProcessError::Failed`]
const EXCERPT_LIMIT: usize = 500;

/// One compile attempt against an allocated workspace
#[derive(Debug)]
pub struct CompileRequest<'a> {
    /// The workspace the passes run in
    pub workspace: &'a Workspace,

    /// Prepared markup, written to the source file verbatim
    pub source: &'a str,

    /// Path to the compiler binary
    pub compiler: &'a Path,

    /// Upper bound on passes; the loop aborts at the first failure
    pub max_passes: u32,

    /// Bound on each individual pass
    pub pass_timeout: Duration,
}

/// Outcome of one attempt: artifact bytes or the first failure, plus
/// the captured log either way.
#[derive(Debug)]
pub struct CompileRun {
    /// Artifact bytes on success, the aborting failure otherwise
    pub result: Result<Vec<u8>, ProcessError>,

    /// Filtered compiler output accumulated across passes
    pub log: String,

    /// Passes actually executed
    pub passes: u32,
}

impl CompileRun {
    /// Check if the attempt produced an artifact
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run the compiler against the workspace for up to `max_passes` passes.
///
/// Each pass is executed non-interactively with halt-on-first-error and
/// output confined to the workspace; a non-zero exit aborts the loop
/// without attempting later passes.
#[instrument(skip(request), fields(max_passes = request.max_passes))]
pub async fn invoke(request: CompileRequest<'_>) -> CompileRun {
    let mut log = String::new();
    let mut passes = 0;

    let result = invoke_inner(&request, &mut log, &mut passes).await;
    if let Err(ref err) = result {
        warn!(%err, passes, "compile attempt failed");
    }

    CompileRun {
        result,
        log,
        passes,
    }
}

async fn invoke_inner(
    request: &CompileRequest<'_>,
    log: &mut String,
    passes: &mut u32,
) -> Result<Vec<u8>, ProcessError> {
    let workspace = request.workspace;
    workspace
        .write_file(SOURCE_FILE, request.source.as_bytes())
        .await?;
    debug!(
        file = SOURCE_FILE,
        len = request.source.len(),
        "wrote source file"
    );

    for pass in 1..=request.max_passes {
        *passes = pass;
        log.push_str(&format!("=== pass {pass}/{} ===\n", request.max_passes));

        let args = TexCommand::new(request.compiler, SOURCE_FILE)
            .output_dir(workspace.root())
            .build();
        debug!(?args, pass, "running compiler pass");

        let child = Command::new(&args[0])
            .args(&args[1..])
            .current_dir(workspace.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(request.pass_timeout, child).await {
            Err(_) => {
                log.push_str("compiler pass timed out\n");
                return Err(ProcessError::Timeout(request.pass_timeout));
            }
            Ok(Err(err)) => return Err(ProcessError::Spawn(err)),
            Ok(Ok(output)) => output,
        };

        append_filtered(log, &String::from_utf8_lossy(&output.stdout));
        append_filtered(log, &String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let exit_code = output.status.code();
            log.push_str(&format!("compiler failed with status {exit_code:?}\n"));
            return Err(ProcessError::Failed {
                exit_code,
                excerpt: failure_excerpt(&output.stdout, &output.stderr),
            });
        }
    }

    let pdf = locate_artifact(workspace).await?;
    log.push_str(&format!("PDF produced: {} bytes\n", pdf.len()));
    Ok(pdf)
}

/// Append combined compiler output to the log, dropping noise:
/// file-stack lines (leading '('), box warnings and blank lines.
fn append_filtered(log: &mut String, raw: &str) {
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('(') {
            continue;
        }
        if trimmed.contains("Overfull") || trimmed.contains("Underfull") {
            continue;
        }

        log.push_str("  ");
        log.extend(trimmed.chars().take(LINE_LIMIT));
        log.push('\n');
    }
}

/// Tail of the pass output carried in [`ProcessError::Failed`].
/// The toolchain prints the actual error last.
fn failure_excerpt(stdout: &[u8], stderr: &[u8]) -> String {
    let text = if stderr.is_empty() {
        String::from_utf8_lossy(stdout)
    } else {
        String::from_utf8_lossy(stderr)
    };
    let text = text.trim();

    let total = text.chars().count();
    if total <= EXCERPT_LIMIT {
        return text.to_owned();
    }
    text.chars().skip(total - EXCERPT_LIMIT).collect()
}

/// Locate the produced PDF: conventional name first, then any PDF left
/// in the workspace.
async fn locate_artifact(workspace: &Workspace) -> Result<Vec<u8>, ProcessError> {
    let conventional = format!("document.{ARTIFACT_EXT}");
    if workspace.file_exists(&conventional).await? {
        return workspace.read_file(&conventional).await;
    }

    let mut entries = tokio::fs::read_dir(workspace.root()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == ARTIFACT_EXT) {
            debug!(path = %path.display(), "artifact found by directory scan");
            return Ok(tokio::fs::read(&path).await?);
        }
    }

    Err(ProcessError::ArtifactMissing)
}
