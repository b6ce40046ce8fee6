//! CLI command implementations.

mod diagrams;
mod html;
mod pdf;

pub(crate) use diagrams::DiagramsArgs;
pub(crate) use html::HtmlArgs;
pub(crate) use pdf::PdfArgs;
