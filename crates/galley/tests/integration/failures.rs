use std::time::Duration;

use galley::{JobStatus, MAX_LOG_CHARS, Pipeline};
use tempfile::TempDir;

use super::{fake_compiler, test_config};

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn failing_pass_stops_the_attempt() {
    let dir = TempDir::new().expect("temp dir");
    let marker = dir.path().join("invocations.log");
    let body = format!(
        "echo run >> \"{}\"\necho \"! Undefined control sequence.\" >&2\nexit 1\n",
        marker.display()
    );
    let compiler = fake_compiler(dir.path(), "fake-xelatex", &body);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("21", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("21", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Error);
    let log = record.log.expect("log attached");
    assert!(log.contains("Undefined control sequence"));

    // the second pass is never attempted after a failure
    let invocations = std::fs::read_to_string(&marker).expect("marker file");
    assert_eq!(invocations.lines().count(), 1);
}

#[tokio::test]
async fn timed_out_pass_fails_the_job() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", "sleep 30\n");
    let mut config = test_config(compiler, dir.path());
    config.pass_timeout_secs = 1;
    let pipeline = Pipeline::with_memory_store(config).expect("pipeline");

    pipeline.submit("22", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("22", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Error);
    let log = record.log.expect("log attached");
    assert!(log.contains("timed out"));
}

#[tokio::test]
async fn missing_pdf_after_clean_exit_fails_the_job() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", "echo done\n");
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("23", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("23", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Error);
    let log = record.log.expect("log attached");
    assert!(log.contains("no PDF was produced"));
    assert!(pipeline.retrieve("23").await.is_err());
}

#[tokio::test]
async fn oddly_named_pdf_is_found_by_directory_scan() {
    let dir = TempDir::new().expect("temp dir");
    let body = "printf '%%PDF-1.4 renamed\\n' > \"$out/texput.pdf\"\n";
    let compiler = fake_compiler(dir.path(), "fake-xelatex", body);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("24", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("24", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Success);
    let pdf = pipeline.retrieve("24").await.expect("artifact");
    assert!(pdf.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn recorded_log_is_capped() {
    let dir = TempDir::new().expect("temp dir");
    // ~40k characters of output before the failure
    let body = "i=0\nwhile [ $i -lt 400 ]; do\n  echo \"noise line $i: abcdefghijklmnopqrstuvwxyz0123456789 abcdefghijklmnopqrstuvwxyz0123456789\"\n  i=$((i+1))\ndone\nexit 1\n";
    let compiler = fake_compiler(dir.path(), "fake-xelatex", body);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("25", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("25", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Error);
    let log = record.log.expect("log attached");
    assert!(log.chars().count() <= MAX_LOG_CHARS);
}

#[tokio::test]
async fn failed_attempt_leaves_no_stale_success() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", "exit 9\n");
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("26", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("26", WAIT).await.expect("terminal");

    assert_eq!(record.status, JobStatus::Error);
    assert!(record.artifact_path.is_none());
    assert!(record.completed_at.is_none());
}
