//! Stage ordering for the manual build pipeline.
//!
//! Two variants share the later stages: the HTML variant
//! (render diagrams, build the HTML tree) and the PDF variant
//! (render diagrams, build the LaTeX tree, compile, publish). Stages run
//! strictly in order; a stage starts only after the previous one succeeded,
//! and the first failure halts the run.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use aq_config::Config;
use aq_diagrams::{ImageFormat, RenderError, RenderOptions, render};

use crate::builder::{BuildError, BuildTarget, DocBuilder};
use crate::compiler::{CompileError, PdfCompiler};
use crate::publisher::{ArtifactPublisher, PublishError};

/// Pipeline stage, named for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Rendering diagram sources to images.
    Rendering,
    /// Building the documentation tree.
    Building,
    /// Compiling the LaTeX tree to PDF.
    Compiling,
    /// Copying the PDF to the publish path.
    Publishing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rendering => "rendering",
            Self::Building => "building",
            Self::Compiling => "compiling",
            Self::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// Error returned by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Diagram rendering stage failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// Documentation build stage failed.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// Document compile stage failed.
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// Publish stage failed.
    #[error("{0}")]
    Publish(#[from] PublishError),

    /// Another run holds the build lock.
    #[error(
        "Another build appears to be running (lock file {} exists); \
         delete it if the previous run was interrupted",
        path.display()
    )]
    Locked {
        /// The lock file path.
        path: PathBuf,
    },

    /// The build lock could not be created.
    #[error("Cannot create lock file {}: {source}", path.display())]
    Lock {
        /// The lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Name of the lock file placed under the build output root.
const LOCK_FILENAME: &str = ".aq.lock";

/// Exclusive per-output-root lock held for the duration of a run.
///
/// Concurrent runs against the same output tree are rejected rather than
/// interleaved. The file is removed when the guard drops; a crashed run can
/// strand it, in which case the error message names the file to delete.
struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    fn acquire(build_dir: &Path) -> Result<Self, PipelineError> {
        let path = build_dir.join(LOCK_FILENAME);
        std::fs::create_dir_all(build_dir).map_err(|source| PipelineError::Lock {
            path: path.clone(),
            source,
        })?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(PipelineError::Locked { path })
            }
            Err(source) => Err(PipelineError::Lock { path, source }),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// The manual build pipeline, wired from configuration.
pub struct Pipeline {
    render_opts: RenderOptions,
    builder: DocBuilder,
    compiler: PdfCompiler,
    publisher: ArtifactPublisher,
}

impl Pipeline {
    /// Wire a pipeline from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            render_opts: Self::render_options(config, false),
            builder: DocBuilder {
                generator_cmd: config.tools.sphinx_build.clone(),
                source_dir: config.docs_resolved.source_dir.clone(),
                build_dir: config.docs_resolved.build_dir.clone(),
            },
            compiler: PdfCompiler {
                compiler_cmd: config.tools.latexmk.clone(),
            },
            publisher: ArtifactPublisher::new(config.publish_resolved.artifact.clone()),
        }
    }

    /// Diagram rendering options derived from configuration.
    ///
    /// Also used by the standalone diagram rendering command.
    #[must_use]
    pub fn render_options(config: &Config, clean: bool) -> RenderOptions {
        RenderOptions {
            source_dir: config.diagrams_resolved.source_dir.clone(),
            include_dir: config.diagrams_resolved.include_dir.clone(),
            output_dir: config.diagrams_resolved.output_dir.clone(),
            // Config validation restricts the format to supported names
            format: ImageFormat::parse(&config.diagrams_resolved.format).unwrap_or_default(),
            renderer_cmd: config.tools.plantuml.clone(),
            clean,
        }
    }

    /// Run the HTML variant: clean-render diagrams, clean-build the HTML
    /// tree.
    ///
    /// Returns the path of the built HTML tree.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; later stages are not attempted.
    pub fn run_html(&self) -> Result<PathBuf, PipelineError> {
        let _lock = BuildLock::acquire(&self.builder.build_dir)?;

        tracing::info!(stage = %Stage::Rendering, "Rendering diagrams");
        let mut opts = self.render_opts.clone();
        opts.clean = true;
        render(&opts)?;

        tracing::info!(stage = %Stage::Building, "Building HTML tree");
        let tree = self.builder.build(BuildTarget::Html)?;

        tracing::info!(tree = %tree.display(), "Documentation built");
        Ok(tree)
    }

    /// Run the PDF variant: render diagrams (unless skipped), build the
    /// LaTeX tree, compile, publish.
    ///
    /// Returns the publish path of the manual.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; later stages are not attempted, and
    /// a previously published artifact is left untouched.
    pub fn run_pdf(&self, skip_diagrams: bool) -> Result<PathBuf, PipelineError> {
        let _lock = BuildLock::acquire(&self.builder.build_dir)?;

        if skip_diagrams {
            tracing::info!(stage = %Stage::Rendering, "Skipping diagram rendering");
        } else {
            tracing::info!(stage = %Stage::Rendering, "Rendering diagrams");
            render(&self.render_opts)?;
        }

        tracing::info!(stage = %Stage::Building, "Building LaTeX tree");
        let latex_tree = self.builder.build(BuildTarget::LatexIntermediate)?;

        tracing::info!(stage = %Stage::Compiling, "Compiling manual");
        let pdf = self.compiler.compile(&latex_tree)?;

        tracing::info!(stage = %Stage::Publishing, "Publishing manual");
        self.publisher.publish(&pdf)?;

        Ok(self.publisher.publish_path().to_path_buf())
    }
}
