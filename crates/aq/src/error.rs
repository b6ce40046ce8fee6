//! CLI error types.

use aq_config::ConfigError;
use aq_diagrams::RenderError;
use aq_manual::PipelineError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Validation(String),
}
