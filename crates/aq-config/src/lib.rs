//! Configuration management for the AQ documentation toolchain.
//!
//! Parses `aq.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `publish.artifact`
//! - `tools.plantuml`
//! - `tools.sphinx_build`
//! - `tools.latexmk`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the documentation source directory.
    pub source_dir: Option<PathBuf>,
    /// Override the build output root.
    pub build_dir: Option<PathBuf>,
    /// Override the publish path for the compiled manual.
    pub artifact: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "aq.toml";

/// Application configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Documentation build configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Diagram rendering configuration.
    diagrams: DiagramsConfigRaw,
    /// Publish configuration.
    publish: PublishConfigRaw,
    /// External tool commands.
    pub tools: ToolsConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Resolved publish configuration (set after loading).
    #[serde(skip)]
    pub publish_resolved: PublishConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    build_dir: Option<String>,
}

/// Resolved documentation build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Sphinx source directory (contains `conf.py`).
    pub source_dir: PathBuf,
    /// Build output root for generated trees.
    pub build_dir: PathBuf,
}

impl DocsConfig {
    /// Output tree for the browsable HTML build.
    #[must_use]
    pub fn html_dir(&self) -> PathBuf {
        self.build_dir.join("html")
    }

    /// Output tree for the LaTeX-intermediate build.
    #[must_use]
    pub fn latex_dir(&self) -> PathBuf {
        self.build_dir.join("latex")
    }
}

/// Raw diagrams configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    source_dir: Option<String>,
    include_dir: Option<String>,
    output_dir: Option<String>,
    format: Option<String>,
}

/// Resolved diagram rendering configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DiagramsConfig {
    /// Directory containing diagram description sources.
    pub source_dir: PathBuf,
    /// Directory of shared `!include` fragments.
    pub include_dir: PathBuf,
    /// Directory receiving rendered images.
    pub output_dir: PathBuf,
    /// Image format for rendered diagrams (`svg` or `png`).
    pub format: String,
}

/// Raw publish configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PublishConfigRaw {
    artifact: Option<String>,
}

/// Resolved publish configuration.
#[derive(Debug, Default)]
pub struct PublishConfig {
    /// Stable path the compiled manual is copied to.
    pub artifact: PathBuf,
}

/// External tool commands, resolved via `PATH` unless given as paths.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Diagram renderer command.
    pub plantuml: String,
    /// Documentation generator command.
    pub sphinx_build: String,
    /// Document compiler driver command.
    pub latexmk: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            plantuml: "plantuml".to_owned(),
            sphinx_build: "sphinx-build".to_owned(),
            latexmk: "latexmk".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`tools.plantuml`").
        field: String,
        /// Error message (e.g., "${`PLANTUML`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `aq.toml` in current directory and parents,
    /// falling back to defaults rooted at the current directory.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(build_dir) = &settings.build_dir {
            self.docs_resolved.build_dir.clone_from(build_dir);
        }
        if let Some(artifact) = &settings.artifact {
            self.publish_resolved.artifact.clone_from(artifact);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self::default();
        // resolve_paths only fails on validation, which defaults pass
        config
            .resolve_paths(base)
            .unwrap_or_else(|_| unreachable!("default configuration is valid"));
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref artifact) = self.publish.artifact {
            self.publish.artifact = Some(expand::expand_env(artifact, "publish.artifact")?);
        }

        self.tools.plantuml = expand::expand_env(&self.tools.plantuml, "tools.plantuml")?;
        self.tools.sphinx_build =
            expand::expand_env(&self.tools.sphinx_build, "tools.sphinx_build")?;
        self.tools.latexmk = expand::expand_env(&self.tools.latexmk, "tools.latexmk")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory
    /// and validate the result.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            build_dir: resolve(self.docs.build_dir.as_deref(), "docs/_build"),
        };

        let diagram_source = resolve(self.diagrams.source_dir.as_deref(), "docs/diagrams");
        // include_dir is relative to the diagram source directory
        let include_dir =
            diagram_source.join(self.diagrams.include_dir.as_deref().unwrap_or("_includes"));
        self.diagrams_resolved = DiagramsConfig {
            source_dir: diagram_source,
            include_dir,
            output_dir: resolve(self.diagrams.output_dir.as_deref(), "docs/_static/diagrams"),
            format: self
                .diagrams
                .format
                .clone()
                .unwrap_or_else(|| "svg".to_owned()),
        };

        self.publish_resolved = PublishConfig {
            artifact: resolve(self.publish.artifact.as_deref(), "manual.pdf"),
        };

        self.validate()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.tools.plantuml, "tools.plantuml")?;
        require_non_empty(&self.tools.sphinx_build, "tools.sphinx_build")?;
        require_non_empty(&self.tools.latexmk, "tools.latexmk")?;

        match self.diagrams_resolved.format.as_str() {
            "svg" | "png" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "diagrams.format must be \"svg\" or \"png\", got \"{other}\""
                )));
            }
        }

        Ok(())
    }
}
