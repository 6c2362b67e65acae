//! Executor family (C2): per-language `prepare` turns source into a
//! ready-to-run argv, compiling first when the language demands it.
//! Represented as a tagged match over `Language`, not a trait hierarchy.

use std::path::Path;
use std::time::Duration;

use codr_protocol::{validate_filename, Language};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),
    #[error("failed to write source file: {0}")]
    WriteFailed(#[from] std::io::Error),
    #[error("compilation timed out")]
    CompileTimeout,
    #[error("compilation failed: {stderr}")]
    CompileFailed { stderr: String },
}

/// Output of a successful `prepare`: the argv to hand to the PTY runner.
pub struct PreparedProgram {
    pub argv: Vec<String>,
}

pub async fn prepare(
    language: Language,
    code: &str,
    filename: &str,
    workdir: &Path,
    compilation_timeout: Duration,
) -> Result<PreparedProgram, ExecutorError> {
    validate_filename(filename).map_err(ExecutorError::InvalidFilename)?;

    let source_path = workdir.join(filename);
    tokio::fs::write(&source_path, code).await?;

    match language {
        Language::Python => Ok(PreparedProgram {
            argv: vec!["python3".to_string(), filename.to_string()],
        }),
        Language::Javascript => Ok(PreparedProgram {
            argv: vec![
                "node".to_string(),
                "--max-old-space-size=64".to_string(),
                "--no-concurrent-recompilation".to_string(),
                "--single-threaded-gc".to_string(),
                filename.to_string(),
            ],
        }),
        Language::C => {
            compile(
                "gcc",
                &["-std=c11", filename, "-lm", "-o", "program"],
                workdir,
                compilation_timeout,
            )
            .await?;
            Ok(PreparedProgram {
                argv: vec!["./program".to_string()],
            })
        }
        Language::Cpp => {
            compile(
                "g++",
                &["-std=c++17", filename, "-lstdc++", "-o", "program"],
                workdir,
                compilation_timeout,
            )
            .await?;
            Ok(PreparedProgram {
                argv: vec!["./program".to_string()],
            })
        }
        Language::Rust => {
            compile(
                "rustc",
                &[filename, "-o", "program"],
                workdir,
                compilation_timeout,
            )
            .await?;
            Ok(PreparedProgram {
                argv: vec!["./program".to_string()],
            })
        }
    }
}

async fn compile(
    compiler: &str,
    args: &[&str],
    workdir: &Path,
    compilation_timeout: Duration,
) -> Result<(), ExecutorError> {
    let output = timeout(
        compilation_timeout,
        Command::new(compiler).args(args).current_dir(workdir).output(),
    )
    .await
    .map_err(|_| ExecutorError::CompileTimeout)??;

    if !output.status.success() {
        return Err(ExecutorError::CompileFailed {
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unsafe_filename() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare(
            Language::Python,
            "print(1)",
            "../evil.py",
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidFilename(_)));
    }

    #[tokio::test]
    async fn python_argv_runs_interpreter_directly() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = prepare(
            Language::Python,
            "print('hi')",
            "main.py",
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(prepared.argv, vec!["python3", "main.py"]);
        assert!(dir.path().join("main.py").exists());
    }
}
