//! `aq pdf` command implementation.

use std::path::PathBuf;

use aq_config::{CliSettings, Config};
use aq_manual::Pipeline;
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the pdf command.
#[derive(Args)]
pub(crate) struct PdfArgs {
    /// Skip diagram rendering and build from existing images.
    #[arg(long)]
    skip_diagrams: bool,

    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Publish path for the compiled manual (overrides config).
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover aq.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl PdfArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            build_dir: None,
            artifact: self.artifact,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Source: {}",
            config.docs_resolved.source_dir.display()
        ));

        let published = Pipeline::from_config(&config).run_pdf(self.skip_diagrams)?;

        output.success(&format!("Manual published to {}", published.display()));
        Ok(())
    }
}
