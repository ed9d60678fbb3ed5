//! Input validation for untrusted markup
//!
//! The only security boundary before the toolchain runs: markup that can
//! invoke shell commands or escape the workspace is rejected here, so no
//! subprocess is ever spawned for it.
//!
//! A denylist over a macro language is necessarily incomplete; the
//! toolchain must still run with shell-escape disabled.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Why a piece of markup was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("markup is empty")]
    EmptyInput,

    #[error("\\begin{{document}} has no matching \\end{{document}}")]
    IncompleteDocument,

    #[error("markup matches denylist rule `{0}`")]
    DangerousDirective(&'static str),
}

/// Directives able to run shell commands or escape the workspace,
/// matched case-insensitively.
static DENYLIST: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        // direct shell execution; the immediate form first so the
        // reported rule names the exact directive
        ("immediate-write18", r"(?i)\\immediate\s*\\write18\s*\{"),
        ("write18", r"(?i)\\write18\s*\{"),
        // shell access through \special
        ("special-shell", r"(?i)\\special\s*\{[^}]*shell[^}]*\}"),
        ("special-exec", r"(?i)\\special\s*\{[^}]*exec[^}]*\}"),
        // parent-directory escape through include directives
        ("input-traversal", r"(?i)\\input\s*\{[^}]*\.\.[^}]*\}"),
        ("include-traversal", r"(?i)\\include\s*\{[^}]*\.\.[^}]*\}"),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        (
            name,
            Regex::new(pattern).expect("denylist pattern should compile"),
        )
    })
    .collect()
});

/// Validate markup before any subprocess is spawned.
///
/// Pure function: rejects empty input, a `\begin{document}` without its
/// matching end marker, and anything on the denylist. The returned
/// error names the rule that matched, so callers can report an
/// actionable reason.
pub fn validate(markup: &str) -> Result<(), ValidationError> {
    if markup.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if markup.contains("\\begin{document}") && !markup.contains("\\end{document}") {
        return Err(ValidationError::IncompleteDocument);
    }

    for (name, pattern) in DENYLIST.iter() {
        if pattern.is_match(markup) {
            return Err(ValidationError::DangerousDirective(name));
        }
    }

    Ok(())
}
