use std::time::Duration;

use galley::{ArtifactStore, JobStatus, Pipeline, prepare};
use tempfile::TempDir;

use super::{HAPPY_BODY, fake_compiler, test_config};

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn round_trip_produces_artifact_and_success() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    let markup = "Hello, typeset world".to_owned();
    let receipt = pipeline.submit("42", markup.clone()).await.expect("accepted");
    assert_eq!(receipt.job_id, "42");
    assert!(receipt.toolchain.banner.contains("FakeTeX"));

    let record = pipeline.wait_for_completion("42", WAIT).await.expect("terminal");
    assert_eq!(record.status, JobStatus::Success);
    assert!(record.completed_at.is_some());

    let pdf = pipeline.retrieve("42").await.expect("artifact");
    assert!(pdf.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn artifact_name_is_derived_from_prepared_markup() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    let markup = "content keyed by hash".to_owned();
    pipeline.submit("7", markup.clone()).await.expect("accepted");
    let record = pipeline.wait_for_completion("7", WAIT).await.expect("terminal");

    let expected = ArtifactStore::artifact_name("7", &prepare(&markup));
    let path = record.artifact_path.expect("artifact path set");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(expected.as_str()));
}

#[tokio::test]
async fn identical_markup_reuses_the_artifact_name() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    let markup = "stable content".to_owned();
    pipeline.submit("7", markup.clone()).await.expect("accepted");
    let first = pipeline.wait_for_completion("7", WAIT).await.expect("terminal");

    pipeline.submit("7", markup).await.expect("accepted again");
    let second = pipeline.wait_for_completion("7", WAIT).await.expect("terminal");

    assert_eq!(first.artifact_path, second.artifact_path);
}

#[tokio::test]
async fn changed_markup_gets_a_fresh_artifact_name() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("7", "first draft".to_owned()).await.expect("accepted");
    let first = pipeline.wait_for_completion("7", WAIT).await.expect("terminal");

    pipeline.submit("7", "second draft".to_owned()).await.expect("accepted");
    let second = pipeline.wait_for_completion("7", WAIT).await.expect("terminal");

    assert_ne!(first.artifact_path, second.artifact_path);
}

#[tokio::test]
async fn status_report_checks_artifact_on_disk() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("9", "content".to_owned()).await.expect("accepted");
    pipeline.wait_for_completion("9", WAIT).await.expect("terminal");

    let report = pipeline.status("9").await.expect("status");
    assert_eq!(report.status, JobStatus::Success);
    assert!(report.artifact_exists);

    // Removing the file flips the report without touching the record
    let path = report.artifact_path.expect("path set");
    std::fs::remove_file(&path).expect("remove artifact");

    let report = pipeline.status("9").await.expect("status");
    assert_eq!(report.status, JobStatus::Success);
    assert!(!report.artifact_exists);
    assert!(pipeline.retrieve("9").await.is_err());
}

#[tokio::test]
async fn log_is_filtered_and_recorded() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("11", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("11", WAIT).await.expect("terminal");

    let log = record.log.expect("log attached");
    assert!(log.contains("pass 1/2"));
    assert!(log.contains("This is FakeTeX"));
    assert!(!log.contains("Overfull"));
    assert!(!log.contains("texmf"));
}

#[tokio::test]
async fn successful_attempt_runs_every_pass() {
    let dir = TempDir::new().expect("temp dir");
    let marker = dir.path().join("invocations.log");
    let body = format!("echo run >> \"{}\"\n{HAPPY_BODY}", marker.display());
    let compiler = fake_compiler(dir.path(), "fake-xelatex", &body);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    pipeline.submit("13", "content".to_owned()).await.expect("accepted");
    let record = pipeline.wait_for_completion("13", WAIT).await.expect("terminal");
    assert_eq!(record.status, JobStatus::Success);

    let invocations = std::fs::read_to_string(&marker).expect("marker file");
    assert_eq!(invocations.lines().count(), 2);
}

#[tokio::test]
async fn unknown_job_reports_pristine_state() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = fake_compiler(dir.path(), "fake-xelatex", HAPPY_BODY);
    let pipeline = Pipeline::with_memory_store(test_config(compiler, dir.path())).expect("pipeline");

    let report = pipeline.status("never-submitted").await.expect("status");
    assert_eq!(report.status, JobStatus::NotCompiled);
    assert!(!report.artifact_exists);
    assert!(report.artifact_path.is_none());
    assert!(report.completed_at.is_none());
}
