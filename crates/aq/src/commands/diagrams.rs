//! `aq diagrams` command implementation.

use std::path::PathBuf;

use aq_config::Config;
use aq_diagrams::{render, render_all};
use aq_manual::Pipeline;
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diagrams command.
#[derive(Args)]
pub(crate) struct DiagramsArgs {
    /// Attempt every diagram and report all failures instead of stopping
    /// at the first one.
    #[arg(long)]
    keep_going: bool,

    /// Keep previously rendered images (skip the clean pass).
    #[arg(long)]
    no_clean: bool,

    /// Path to configuration file (default: auto-discover aq.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl DiagramsArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), None)?;
        let opts = Pipeline::render_options(&config, !self.no_clean);

        let rendered = if self.keep_going {
            let outcome = render_all(&opts)?;
            for err in &outcome.errors {
                output.error(&err.to_string());
            }
            if !outcome.errors.is_empty() {
                return Err(CliError::Validation(format!(
                    "{} diagram(s) failed to render",
                    outcome.errors.len()
                )));
            }
            outcome.rendered
        } else {
            render(&opts)?
        };

        output.success(&format!(
            "Rendered {} diagram(s) to {}",
            rendered.len(),
            opts.output_dir.display()
        ));
        Ok(())
    }
}
