//! Command builder for the TeX compiler CLI
//!
//! Builds the argument vector for one compiler pass.

use std::path::PathBuf;

/// Builder for a single compiler invocation.
///
/// Every pass runs non-interactively with output confined to the
/// workspace through an explicit output directory.
#[derive(Debug)]
pub struct TexCommand {
    /// Path to the compiler binary
    compiler: PathBuf,
    /// Source file name, relative to the working directory
    source: String,
    /// -output-directory
    output_dir: Option<PathBuf>,
    /// -halt-on-error
    halt_on_error: bool,
}

impl TexCommand {
    /// Create a new compiler command builder
    pub fn new(compiler: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            source: source.into(),
            output_dir: None,
            halt_on_error: true,
        }
    }

    /// Confine produced files to the given directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Stop at the first error instead of attempting recovery
    pub fn halt_on_error(mut self, enable: bool) -> Self {
        self.halt_on_error = enable;
        self
    }

    /// Build the command-line arguments, program first.
    ///
    /// Consumes self to avoid cloning the argument strings.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![self.compiler.to_string_lossy().into_owned()];

        // Never prompt on errors; the process has no interactive stdin
        args.push("-interaction=nonstopmode".to_owned());

        if self.halt_on_error {
            args.push("-halt-on-error".to_owned());
        }

        if let Some(ref dir) = self.output_dir {
            args.push("-output-directory".to_owned());
            args.push(dir.to_string_lossy().into_owned());
        }

        args.push(self.source);
        args
    }
}
