//! LaTeX compiler boundary.
//!
//! The compiler is an external process with its own validity rules. Success is
//! a zero exit status; the caller additionally requires the PDF to exist.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// How much compiler output is kept for the logs.
const OUTPUT_TAIL_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to start compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler exited with {status}")]
    Failed { status: String, output: String },

    #[error("compiler produced no PDF at {0}")]
    MissingOutput(PathBuf),

    #[error("compiler timed out after {0:?}")]
    TimedOut(Duration),
}

impl CompileError {
    /// Captured compiler output, if any. For logs only.
    pub fn output(&self) -> Option<&str> {
        match self {
            CompileError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Turns a `.tex` file into a PDF in `output_dir`.
#[async_trait]
pub trait LatexCompiler: Send + Sync {
    async fn compile(&self, tex_path: &Path, output_dir: &Path) -> Result<(), CompileError>;
}

/// Runs `pdflatex` (or a drop-in replacement) non-interactively, halting on the first error.
#[derive(Debug, Clone)]
pub struct PdfLatex {
    program: String,
}

impl PdfLatex {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl LatexCompiler for PdfLatex {
    async fn compile(&self, tex_path: &Path, output_dir: &Path) -> Result<(), CompileError> {
        debug!("Running {} on {}", self.program, tex_path.display());

        let output = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg("-output-directory")
            .arg(output_dir)
            .arg(tex_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Err(CompileError::Failed {
            status: output.status.to_string(),
            output: tail(&combined, OUTPUT_TAIL_BYTES).to_string(),
        })
    }
}

/// The last `max` bytes of `text`, moved forward to a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tail_short_text_untouched() {
        assert_eq!(tail("abc", 10), "abc");
    }

    #[test]
    fn test_tail_keeps_end_on_char_boundary() {
        let text = format!("{}é!", "x".repeat(10));
        let t = tail(&text, 2);
        assert_eq!(t, "!");
        assert_eq!(tail(&text, 3), "é!");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let tex = dir.path().join("job.tex");
        std::fs::write(&tex, "\\documentclass{article}").unwrap();

        let err = PdfLatex::new("false")
            .compile(&tex, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Failed { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let dir = TempDir::new().unwrap();
        let tex = dir.path().join("job.tex");
        std::fs::write(&tex, "x").unwrap();

        PdfLatex::new("true").compile(&tex, dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = PdfLatex::new("definitely-not-a-latex-compiler-7f3a")
            .compile(&dir.path().join("job.tex"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Spawn { .. }));
    }
}
