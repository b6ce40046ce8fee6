//! Manual build pipeline for the AQ documentation toolchain.
//!
//! Orchestrates the fail-fast stage sequence that produces the package
//! manual: diagram rendering ([`aq_diagrams`]), the Sphinx build to a
//! browsable HTML tree or a LaTeX-intermediate tree ([`DocBuilder`]), the
//! LaTeX-to-PDF compile ([`PdfCompiler`]), and publication of the PDF to
//! its stable path ([`ArtifactPublisher`]).
//!
//! Each stage is a blocking invocation of an external tool; a stage only
//! starts once the previous stage has succeeded, and the first failure
//! halts the run with the tool's own diagnostics attached.

mod builder;
mod compiler;
mod pipeline;
mod publisher;

pub use builder::{BuildError, BuildTarget, DocBuilder};
pub use compiler::{CompileError, PdfCompiler};
pub use pipeline::{Pipeline, PipelineError, Stage};
pub use publisher::{ArtifactPublisher, PublishError};
