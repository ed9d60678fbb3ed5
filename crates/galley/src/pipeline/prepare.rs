//! Markup preprocessing
//!
//! Wraps bare content in a document envelope and injects locale/font
//! directives for Cyrillic text ahead of compilation. Re-running the
//! step on its own output is a no-op: duplicate package loads would
//! fail the compile.

/// Preamble markers indicating locale support is already declared
const LOCALE_MARKERS: [&str; 3] = [
    "\\usepackage[english,russian]{babel}",
    "\\usepackage{polyglossia}",
    "\\usepackage[utf8]{inputenc}",
];

/// Locale and font directives inserted after `\documentclass`
const LOCALE_PREAMBLE: &str = "\\usepackage{fontspec}\n\
\\usepackage{polyglossia}\n\
\\setmainlanguage{russian}\n\
\\setotherlanguage{english}\n\
\\newfontfamily\\russianfont{CMU Serif}\n\
\\newfontfamily\\russianfonttt{CMU Typewriter Text}\n\
\\newfontfamily\\russianfontsf{CMU Sans Serif}\n";

/// Prepare markup for compilation. Total and deterministic.
///
/// Markup that already declares locale support comes back unchanged.
/// Markup with a document class but no locale support gets the locale
/// preamble inserted after the class declaration. Bare content is
/// wrapped in a minimal `article` envelope carrying the same preamble.
pub fn prepare(markup: &str) -> String {
    if markup.contains("\\documentclass") {
        if LOCALE_MARKERS.iter().any(|marker| markup.contains(marker)) {
            return markup.to_owned();
        }
        return inject_after_documentclass(markup);
    }

    wrap_in_envelope(markup)
}

/// Insert the locale preamble right after the first line declaring the
/// document class.
fn inject_after_documentclass(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len() + LOCALE_PREAMBLE.len() + 1);
    let mut injected = false;

    for line in markup.lines() {
        out.push_str(line);
        out.push('\n');
        if !injected && line.contains("\\documentclass") {
            out.push_str(LOCALE_PREAMBLE);
            injected = true;
        }
    }

    out
}

/// Wrap bare content in a minimal document envelope
fn wrap_in_envelope(content: &str) -> String {
    format!(
        "\\documentclass{{article}}\n{LOCALE_PREAMBLE}\n\\begin{{document}}\n\n{content}\n\n\\end{{document}}\n"
    )
}
