//! Output sanitizer (C9): ANSI strip, path redaction, stack-trace
//! trimming, newline collapsing. Applied by the worker before publishing
//! each output chunk; a failure here falls back to the raw bytes.

use codr_protocol::Language;
use regex::Regex;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
static MACOS_TMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/private/var/folders/[^/]+/[^/]+/[^/]+/[^/]+/").unwrap());
static VAR_FOLDERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/var/folders/[^/]+/[^/]+/[^/]+/[^/]+/").unwrap());
static TMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/tmp/[^/]+/").unwrap());
static BLANK_RUNS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const JS_SKIP_PATTERNS: &[&str] = &[
    "at Module._compile",
    "at Object..js",
    "at Module.load",
    "at Function._load",
    "at TracingChannel",
    "at wrapModuleLoad",
    "at Function.executeUserEntryPoint",
    "at node:internal",
];

const PYTHON_SKIP_SUBSTRING: &str = "File";
const PYTHON_SKIP_MARKER: &str = "site-packages";

pub fn sanitize(chunk: &str, workdir: &str, language: Language) -> String {
    let result = std::panic::catch_unwind(|| sanitize_inner(chunk, workdir, language));
    result.unwrap_or_else(|_| chunk.to_string())
}

fn sanitize_inner(chunk: &str, workdir: &str, language: Language) -> String {
    let mut text = ANSI_RE.replace_all(chunk, "").to_string();

    let workdir_prefix = format!("{}/", workdir.trim_end_matches('/'));
    text = text.replace(&workdir_prefix, "");
    text = MACOS_TMP_RE.replace_all(&text, "").to_string();
    text = VAR_FOLDERS_RE.replace_all(&text, "").to_string();
    text = TMP_RE.replace_all(&text, "").to_string();

    let looks_like_error =
        text.contains("Error:") || text.contains("Traceback") || text.contains("Exception");
    if looks_like_error {
        text = filter_stack_trace(&text, language);
    }

    text = BLANK_RUNS_RE.replace_all(&text, "\n\n").to_string();
    text.trim().to_string()
}

fn filter_stack_trace(text: &str, language: Language) -> String {
    match language {
        Language::Javascript => text
            .lines()
            .filter(|line| !JS_SKIP_PATTERNS.iter().any(|p| line.contains(p)))
            .filter(|line| !is_node_version_banner(line))
            .collect::<Vec<_>>()
            .join("\n"),
        Language::Python => text
            .lines()
            .filter(|line| {
                line.starts_with("Traceback")
                    || !(line.contains(PYTHON_SKIP_SUBSTRING) && line.contains(PYTHON_SKIP_MARKER))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => text.to_string(),
    }
}

fn is_node_version_banner(line: &str) -> bool {
    line.trim_start().starts_with("Node.js v")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi_codes() {
        let input = "\x1b[31mhello\x1b[0m";
        assert_eq!(sanitize(input, "/tmp/job", Language::Python), "hello");
    }

    #[test]
    fn redacts_workdir_prefix() {
        let input = "/tmp/job42/main.py: error";
        let out = sanitize(input, "/tmp/job42", Language::Python);
        assert_eq!(out, "main.py: error");
    }

    #[test]
    fn collapses_blank_runs() {
        let input = "a\n\n\n\n\nb";
        assert_eq!(sanitize(input, "/tmp/x", Language::Python), "a\n\nb");
    }

    #[test]
    fn drops_site_packages_frames_but_keeps_traceback() {
        let input = "Traceback (most recent call last):\n  File \"/usr/lib/site-packages/x.py\", line 1\n  File \"main.py\", line 2\nValueError: bad";
        let out = sanitize(input, "/tmp/x", Language::Python);
        assert!(out.contains("Traceback"));
        assert!(!out.contains("site-packages"));
        assert!(out.contains("main.py"));
    }

    #[test]
    fn sanitizing_an_already_sanitized_chunk_is_a_fixed_point() {
        let input = "Traceback (most recent call last):\nValueError: bad\n";
        let once = sanitize(input, "/tmp/x", Language::Python);
        let twice = sanitize(&once, "/tmp/x", Language::Python);
        assert_eq!(once, twice);
    }
}
