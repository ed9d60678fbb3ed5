//! Integration tests for galley
//!
//! The compile-path tests drive the pipeline with fake compiler scripts
//! written at test time, so no TeX installation is required. The
//! scripts are POSIX shell; the suite is unix-only.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use galley::Config;

mod failures;
mod pipeline_flow;

/// Write an executable fake compiler script into `dir`.
///
/// The body runs after a `--version` handler, so the pre-flight probe
/// always succeeds; compile invocations fall through to `body` with the
/// usual argument vector.
pub(crate) fn fake_compiler(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!(
        r#"#!/bin/sh
set -eu
if [ "${{1:-}}" = "--version" ]; then
  echo "FakeTeX 3.14159 (sham)"
  exit 0
fi
out=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    -output-directory)
      shift
      out="$1"
      ;;
    *)
      ;;
  esac
  shift
done
{body}
"#
    );
    write_executable(&path, &script);
    path
}

/// Write a raw executable script, with no `--version` handler.
pub(crate) fn plain_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    write_executable(&path, content);
    path
}

fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).expect("write script");
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("make script executable");
}

/// Script body emulating a successful pass: noisy output plus a PDF
/// dropped into the output directory.
pub(crate) const HAPPY_BODY: &str = r#"echo "This is FakeTeX, Version 3.14159"
echo "(/usr/share/texmf/article.cls"
echo "Overfull \hbox (1.5pt too wide) in paragraph"
printf '%%PDF-1.4 fake document body\n' > "$out/document.pdf"
"#;

/// Test config pointing at a fake compiler, with scratch and artifact
/// directories under `root`.
pub(crate) fn test_config(compiler: PathBuf, root: &Path) -> Config {
    Config {
        compiler_path: Some(compiler),
        max_passes: 2,
        pass_timeout_secs: 5,
        probe_timeout_secs: 2,
        scratch_root: Some(root.join("scratch")),
        artifact_dir: root.join("artifacts"),
    }
}
