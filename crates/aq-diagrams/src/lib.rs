//! `PlantUML` diagram rendering for the AQ documentation toolchain.
//!
//! This crate turns the diagram description sources under the documentation
//! tree into image files the generated pages embed:
//! - [`scan_sources`] enumerates diagram sources in a deterministic order
//! - `!include` directives are resolved against the shared fragments
//!   directory before rendering; an unresolvable include is fatal for that
//!   diagram
//! - Rendering invokes the external `plantuml` command per diagram, fanned
//!   out on the rayon thread pool
//! - Clean mode deletes previously rendered images first, so the output set
//!   exactly mirrors the current source set
//!
//! # Example
//!
//! ```ignore
//! use aq_diagrams::{ImageFormat, RenderOptions, render};
//!
//! let opts = RenderOptions {
//!     source_dir: "docs/diagrams".into(),
//!     include_dir: "docs/diagrams/_includes".into(),
//!     output_dir: "docs/_static/diagrams".into(),
//!     format: ImageFormat::Svg,
//!     renderer_cmd: "plantuml".into(),
//!     clean: true,
//! };
//! let images = render(&opts)?;
//! ```

mod includes;
mod renderer;

pub use renderer::{
    ImageFormat, RenderError, RenderOptions, RenderOutcome, render, render_all, scan_sources,
};
