//! Sphinx invocation for the documentation build stage.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Target format for the documentation build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    /// Browsable HTML tree.
    Html,
    /// LaTeX-intermediate tree, consumed by the PDF compile stage.
    LatexIntermediate,
}

impl BuildTarget {
    /// Builder name for this target, as passed to `sphinx-build -M`.
    #[must_use]
    pub fn builder_name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::LatexIntermediate => "latex",
        }
    }
}

/// Error returned by the documentation builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Source tree is missing or has no `conf.py`.
    #[error("Documentation source tree not found at {} (no conf.py)", path.display())]
    MissingSourceTree {
        /// The expected source directory.
        path: PathBuf,
    },

    /// The generator command could not be started at all.
    #[error("Cannot run documentation generator '{command}': {source}")]
    Spawn {
        /// The configured generator command.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The generator exited non-zero.
    #[error("Documentation build ({target}) failed ({status}):\n{stderr}")]
    Generator {
        /// Builder name that failed (`html` or `latex`).
        target: &'static str,
        /// Exit status of the generator process.
        status: ExitStatus,
        /// Generator stderr, verbatim.
        stderr: String,
    },

    /// I/O error preparing the build tree.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being prepared.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Builds the documentation tree by driving `sphinx-build`.
#[derive(Debug, Clone)]
pub struct DocBuilder {
    /// Generator command, resolved via `PATH` unless given as a path.
    pub generator_cmd: String,
    /// Sphinx source directory (contains `conf.py`).
    pub source_dir: PathBuf,
    /// Build output root; target trees are created beneath it.
    pub build_dir: PathBuf,
}

impl DocBuilder {
    /// Build the documentation tree for `target`.
    ///
    /// The HTML tree is deleted before rebuilding so pages of renamed or
    /// removed sources cannot survive. The LaTeX tree relies on the
    /// generator's own overwrite behavior.
    ///
    /// Returns the path of the built tree (`<build_dir>/html` or
    /// `<build_dir>/latex`).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the source tree is missing, the
    /// generator cannot be started, or it exits non-zero.
    pub fn build(&self, target: BuildTarget) -> Result<PathBuf, BuildError> {
        if !self.source_dir.join("conf.py").is_file() {
            return Err(BuildError::MissingSourceTree {
                path: self.source_dir.clone(),
            });
        }

        let tree = self.build_dir.join(target.builder_name());
        if target == BuildTarget::Html && tree.exists() {
            tracing::debug!(tree = %tree.display(), "Removing previous HTML tree");
            std::fs::remove_dir_all(&tree).map_err(|source| BuildError::Io {
                path: tree.clone(),
                source,
            })?;
        }

        tracing::info!(
            target = target.builder_name(),
            source = %self.source_dir.display(),
            "Building documentation"
        );

        let mut command = Command::new(&self.generator_cmd);
        command
            .arg("-M")
            .arg(target.builder_name())
            .arg(&self.source_dir)
            .arg(&self.build_dir);
        // The latex tag lets the source tree switch behavior for the PDF
        // build (e.g. raster diagram output)
        if target == BuildTarget::LatexIntermediate {
            command.args(["-t", "latex"]);
        }

        let output = command.output().map_err(|source| BuildError::Spawn {
            command: self.generator_cmd.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(BuildError::Generator {
                target: target.builder_name(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "Generator output"
        );
        Ok(tree)
    }
}
