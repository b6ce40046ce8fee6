//! `aq html` command implementation.

use std::path::PathBuf;

use aq_config::{CliSettings, Config};
use aq_manual::Pipeline;
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the html command.
#[derive(Args)]
pub(crate) struct HtmlArgs {
    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Build output root (overrides config).
    #[arg(short = 'o', long)]
    build_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover aq.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl HtmlArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            build_dir: self.build_dir,
            artifact: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Source: {}",
            config.docs_resolved.source_dir.display()
        ));

        let tree = Pipeline::from_config(&config).run_html()?;

        output.success(&format!("Documentation built to {}", tree.display()));
        Ok(())
    }
}
