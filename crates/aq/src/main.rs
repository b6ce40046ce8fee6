//! AQ CLI - Documentation toolchain.
//!
//! Provides commands for:
//! - `html`: Build the browsable HTML documentation
//! - `pdf`: Build, compile, and publish the PDF manual
//! - `diagrams`: Render architecture diagrams standalone

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DiagramsArgs, HtmlArgs, PdfArgs};
use output::Output;

/// AQ - Documentation toolchain.
#[derive(Parser)]
#[command(name = "aq", version, about)]
struct Cli {
    /// Enable info-level logging (otherwise RUST_LOG applies).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the browsable HTML documentation.
    Html(HtmlArgs),
    /// Build, compile, and publish the PDF manual.
    Pdf(PdfArgs),
    /// Render architecture diagrams.
    Diagrams(DiagramsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Html(args) => args.execute(),
        Commands::Pdf(args) => args.execute(),
        Commands::Diagrams(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pdf_flags_parse() {
        let cli = Cli::try_parse_from(["aq", "pdf", "--skip-diagrams", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Pdf(_)));
    }
}
