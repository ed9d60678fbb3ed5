use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../galley.example.toml");

/// Compiler binary resolved through PATH when `compiler_path` is unset.
pub const DEFAULT_COMPILER: &str = "xelatex";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the compilation pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the TeX compiler binary (uses PATH if not specified).
    #[serde(default)]
    pub compiler_path: Option<PathBuf>,

    /// Compiler passes per attempt. Typesetting toolchains need a
    /// second pass to resolve cross-references.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    /// Bound on a single compiler pass, in seconds.
    #[serde(default = "default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,

    /// Bound on the toolchain version probe, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Root under which per-attempt scratch workspaces are allocated.
    /// Falls back to the platform temp directory when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,

    /// Directory where compiled artifacts are persisted.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Config {
    /// Create a new config from the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the path to the compiler binary
    pub fn compiler_binary(&self) -> PathBuf {
        self.compiler_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILER))
    }

    /// Get the scratch root for workspace allocation
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("galley"))
    }

    /// Bound on one compiler pass
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    /// Bound on the version probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_max_passes() -> u32 {
    2
}

fn default_pass_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
