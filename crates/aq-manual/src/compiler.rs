//! LaTeX-to-PDF compilation for the manual.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Error returned by the document compiler.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// LaTeX-intermediate tree is missing.
    #[error("LaTeX tree not found at {}", path.display())]
    MissingLatexTree {
        /// The expected tree path.
        path: PathBuf,
    },

    /// The compiler command could not be started at all.
    #[error("Cannot run document compiler '{command}': {source}")]
    Spawn {
        /// The configured compiler command.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The compiler exited non-zero.
    #[error("Document compile failed ({status}):\n{log}")]
    Compiler {
        /// Exit status of the compiler process.
        status: ExitStatus,
        /// Combined stdout/stderr of the compiler, verbatim. LaTeX engines
        /// print most diagnostics on stdout.
        log: String,
    },

    /// The compiler exited zero but produced no PDF.
    #[error("Compiler reported success but no PDF found in {}", path.display())]
    MissingPdf {
        /// The tree that was searched.
        path: PathBuf,
    },

    /// I/O error inspecting the LaTeX tree.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Compiles the LaTeX-intermediate tree into the final PDF.
///
/// The compiler driver owns the multi-pass iteration that resolves tables
/// of contents and cross-references; this stage only observes its overall
/// exit status.
#[derive(Debug, Clone)]
pub struct PdfCompiler {
    /// Compiler driver command, resolved via `PATH` unless given as a path.
    pub compiler_cmd: String,
}

impl PdfCompiler {
    /// Compile the LaTeX tree at `latex_dir` and return the produced PDF.
    ///
    /// Runs the driver non-interactively with halt-on-first-error, so an
    /// unattended build can never block on a prompt. The driver operates
    /// inside `latex_dir` and must not touch anything outside it.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the tree is missing, the driver cannot
    /// be started, it exits non-zero, or no PDF is produced.
    pub fn compile(&self, latex_dir: &Path) -> Result<PathBuf, CompileError> {
        if !latex_dir.is_dir() {
            return Err(CompileError::MissingLatexTree {
                path: latex_dir.to_path_buf(),
            });
        }

        tracing::info!(tree = %latex_dir.display(), "Compiling manual");

        let output = Command::new(&self.compiler_cmd)
            .args(["-pdf", "-interaction=nonstopmode", "-halt-on-error"])
            .current_dir(latex_dir)
            .output()
            .map_err(|source| CompileError::Spawn {
                command: self.compiler_cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.stderr.is_empty() {
                log.push('\n');
                log.push_str(&String::from_utf8_lossy(&output.stderr));
            }
            return Err(CompileError::Compiler {
                status: output.status,
                log,
            });
        }

        find_pdf(latex_dir)
    }
}

/// Locate the produced PDF inside the LaTeX tree.
fn find_pdf(latex_dir: &Path) -> Result<PathBuf, CompileError> {
    let entries = std::fs::read_dir(latex_dir).map_err(|source| CompileError::Io {
        path: latex_dir.to_path_buf(),
        source,
    })?;

    let mut pdfs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CompileError::Io {
            path: latex_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "pdf") {
            pdfs.push(path);
        }
    }
    pdfs.sort();

    pdfs.into_iter()
        .next()
        .ok_or_else(|| CompileError::MissingPdf {
            path: latex_dir.to_path_buf(),
        })
}
