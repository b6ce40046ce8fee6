//! Diagram rendering via the external `plantuml` command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use rayon::prelude::*;

use crate::includes::resolve_includes;

/// Image format for rendered diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Vector output (default; scales cleanly in HTML pages).
    #[default]
    Svg,
    /// Raster output (used by the LaTeX build).
    Png,
}

impl ImageFormat {
    /// Parse a format name as it appears in configuration.
    ///
    /// Returns None if the name is not a supported format.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// File extension for rendered images.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    /// Renderer command-line flag selecting this format.
    #[must_use]
    pub fn renderer_flag(self) -> &'static str {
        match self {
            Self::Svg => "-tsvg",
            Self::Png => "-tpng",
        }
    }
}

/// Source file extensions recognized as diagram descriptions.
const SOURCE_EXTENSIONS: [&str; 3] = ["puml", "pu", "plantuml"];

/// Image extensions removed by clean mode.
const IMAGE_EXTENSIONS: [&str; 2] = ["svg", "png"];

/// Options for a diagram rendering run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Directory containing diagram description sources.
    pub source_dir: PathBuf,
    /// Directory of shared `!include` fragments.
    pub include_dir: PathBuf,
    /// Directory receiving rendered images.
    pub output_dir: PathBuf,
    /// Output image format.
    pub format: ImageFormat,
    /// Renderer command, resolved via `PATH` unless given as a path.
    pub renderer_cmd: String,
    /// Delete previously rendered images before rendering, so the output
    /// set exactly mirrors the current source set.
    pub clean: bool,
}

/// Error returned by the diagram renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Diagram output directory cannot be created or cleaned.
    #[error("Cannot prepare diagram output directory {}: {source}", path.display())]
    OutputDir {
        /// The output directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An `!include` reference does not resolve to a fragment file.
    #[error(
        "{}: include file not found: '{include}' (searched: {})",
        diagram.display(),
        searched.display()
    )]
    UnresolvedInclude {
        /// Diagram source the include appears in.
        diagram: PathBuf,
        /// The include reference as written.
        include: String,
        /// The path that was tried.
        searched: PathBuf,
    },

    /// Include nesting exceeded the bound (usually a fragment cycle).
    #[error("{}: include depth exceeded maximum of {max}", diagram.display())]
    IncludeDepth {
        /// Diagram source being resolved.
        diagram: PathBuf,
        /// The nesting bound.
        max: usize,
    },

    /// The renderer command could not be started at all.
    #[error("Cannot run renderer '{command}': {source}")]
    Spawn {
        /// The configured renderer command.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The renderer exited non-zero for a diagram.
    #[error("{}: renderer failed ({status}):\n{stderr}", diagram.display())]
    Renderer {
        /// Diagram source that failed to render.
        diagram: PathBuf,
        /// Exit status of the renderer process.
        status: ExitStatus,
        /// Renderer stderr, verbatim.
        stderr: String,
    },

    /// I/O error reading a source or writing an image.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result of a keep-going rendering run: successfully rendered images
/// alongside the per-diagram failures.
#[derive(Debug)]
pub struct RenderOutcome {
    /// Paths of successfully rendered images.
    pub rendered: Vec<PathBuf>,
    /// Per-diagram failures, in source order.
    pub errors: Vec<RenderError>,
}

/// Enumerate diagram sources directly under `source_dir`, sorted.
///
/// Only the top level is scanned; fragment directories live in
/// subdirectories and are never rendered standalone.
///
/// # Errors
///
/// Returns [`RenderError::Io`] when the directory cannot be read.
pub fn scan_sources(source_dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let mut sources = Vec::new();
    for ext in SOURCE_EXTENSIONS {
        let pattern = source_dir.join(format!("*.{ext}")).display().to_string();
        let paths = glob::glob(&pattern).map_err(|e| RenderError::Io {
            path: source_dir.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        for entry in paths {
            let path = entry.map_err(|e| RenderError::Io {
                path: source_dir.to_path_buf(),
                source: e.into_error(),
            })?;
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Render every diagram source, collecting per-diagram failures instead of
/// stopping at the first one.
///
/// Fatal setup problems (unreadable source directory, unusable output
/// directory) are returned as `Err`; per-diagram failures are partitioned
/// into the returned [`RenderOutcome`]. Rendering of independent diagrams
/// runs on the rayon thread pool.
///
/// # Errors
///
/// Returns an error when the source set cannot be enumerated or the output
/// directory cannot be prepared.
pub fn render_all(opts: &RenderOptions) -> Result<RenderOutcome, RenderError> {
    let sources = scan_sources(&opts.source_dir)?;

    std::fs::create_dir_all(&opts.output_dir).map_err(|source| RenderError::OutputDir {
        path: opts.output_dir.clone(),
        source,
    })?;

    if opts.clean {
        clean_rendered_images(&opts.output_dir)?;
    }

    tracing::info!(
        count = sources.len(),
        output = %opts.output_dir.display(),
        "Rendering diagrams"
    );

    let results: Vec<Result<PathBuf, RenderError>> = sources
        .par_iter()
        .map(|source| render_one(opts, source))
        .collect();

    let mut rendered = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(path) => rendered.push(path),
            Err(err) => errors.push(err),
        }
    }

    Ok(RenderOutcome { rendered, errors })
}

/// Render every diagram source, failing the run on the first error.
///
/// This is the mode the HTML and PDF pipelines use: any diagram failure is
/// fatal to the stage.
///
/// # Errors
///
/// Returns the first per-diagram failure, or any fatal setup error.
pub fn render(opts: &RenderOptions) -> Result<Vec<PathBuf>, RenderError> {
    let outcome = render_all(opts)?;
    if let Some(first) = outcome.errors.into_iter().next() {
        return Err(first);
    }
    Ok(outcome.rendered)
}

/// Delete previously rendered images from the output directory.
fn clean_rendered_images(output_dir: &Path) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(output_dir).map_err(|source| RenderError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| RenderError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e));
        if is_image {
            tracing::debug!(image = %path.display(), "Removing stale image");
            std::fs::remove_file(&path).map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Render a single diagram source to an image file.
fn render_one(opts: &RenderOptions, source: &Path) -> Result<PathBuf, RenderError> {
    let text = std::fs::read_to_string(source).map_err(|e| RenderError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    let prepared = resolve_includes(&text, source, &opts.include_dir)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image_path = opts
        .output_dir
        .join(format!("{stem}.{}", opts.format.extension()));

    // -pipe keeps output naming under our control and avoids scratch files
    let mut child = Command::new(&opts.renderer_cmd)
        .arg("-pipe")
        .arg(opts.format.renderer_flag())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RenderError::Spawn {
            command: opts.renderer_cmd.clone(),
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(prepared.as_bytes())
            .map_err(|e| RenderError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;
    }

    let output = child.wait_with_output().map_err(|e| RenderError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(RenderError::Renderer {
            diagram: source.to_path_buf(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    std::fs::write(&image_path, &output.stdout).map_err(|e| RenderError::Io {
        path: image_path.clone(),
        source: e,
    })?;

    tracing::debug!(
        diagram = %source.display(),
        image = %image_path.display(),
        "Rendered"
    );
    Ok(image_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable stub renderer script and return its path.
    fn stub_renderer(dir: &Path, body: &str) -> String {
        let path = dir.join("plantuml-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    /// A renderer stub that echoes a fixed SVG for any input.
    fn ok_renderer(dir: &Path) -> String {
        stub_renderer(dir, "cat > /dev/null\nprintf '<svg/>'")
    }

    fn options(root: &TempDir, renderer_cmd: String) -> RenderOptions {
        let source_dir = root.path().join("diagrams");
        std::fs::create_dir_all(source_dir.join("_includes")).unwrap();
        RenderOptions {
            include_dir: source_dir.join("_includes"),
            source_dir,
            output_dir: root.path().join("out"),
            format: ImageFormat::Svg,
            renderer_cmd,
            clean: false,
        }
    }

    #[test]
    fn format_parse_and_flags() {
        assert_eq!(ImageFormat::parse("svg"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::parse("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse("pdf"), None);
        assert_eq!(ImageFormat::Svg.renderer_flag(), "-tsvg");
        assert_eq!(ImageFormat::Png.extension(), "png");
    }

    #[test]
    fn scan_finds_sources_sorted_and_skips_fragments() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("diagrams");
        std::fs::create_dir_all(dir.join("_includes")).unwrap();
        std::fs::write(dir.join("b.pu"), "").unwrap();
        std::fs::write(dir.join("a.puml"), "").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();
        std::fs::write(dir.join("_includes/frag.puml"), "").unwrap();

        let sources = scan_sources(&dir).unwrap();
        assert_eq!(sources, vec![dir.join("a.puml"), dir.join("b.pu")]);
    }

    #[test]
    fn renders_each_source_to_an_image() {
        let root = TempDir::new().unwrap();
        let opts = options(&root, ok_renderer(root.path()));
        std::fs::write(opts.source_dir.join("flow.puml"), "@startuml\nA -> B\n@enduml").unwrap();

        let images = render(&opts).unwrap();
        assert_eq!(images, vec![opts.output_dir.join("flow.svg")]);
        assert_eq!(std::fs::read_to_string(&images[0]).unwrap(), "<svg/>");
    }

    #[test]
    fn clean_mode_removes_stale_images() {
        let root = TempDir::new().unwrap();
        let mut opts = options(&root, ok_renderer(root.path()));
        opts.clean = true;
        std::fs::create_dir_all(&opts.output_dir).unwrap();
        std::fs::write(opts.output_dir.join("deleted-diagram.svg"), "old").unwrap();
        std::fs::write(opts.output_dir.join("README"), "keep").unwrap();
        std::fs::write(opts.source_dir.join("flow.puml"), "@startuml\n@enduml").unwrap();

        render(&opts).unwrap();

        assert!(!opts.output_dir.join("deleted-diagram.svg").exists());
        assert!(opts.output_dir.join("flow.svg").exists());
        // Non-image files survive the clean
        assert!(opts.output_dir.join("README").exists());
    }

    #[test]
    fn renderer_failure_reports_stderr_and_writes_nothing() {
        let root = TempDir::new().unwrap();
        let cmd = stub_renderer(
            root.path(),
            "cat > /dev/null\necho 'syntax error at line 3' >&2\nexit 1",
        );
        let opts = options(&root, cmd);
        std::fs::write(opts.source_dir.join("bad.puml"), "@startuml\n???\n@enduml").unwrap();

        let err = render(&opts).unwrap_err();
        match &err {
            RenderError::Renderer { stderr, .. } => {
                assert!(stderr.contains("syntax error at line 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!opts.output_dir.join("bad.svg").exists());
    }

    #[test]
    fn unresolved_include_fails_without_invoking_renderer() {
        let root = TempDir::new().unwrap();
        // A stub that would leave a marker if it ever ran
        let marker = root.path().join("invoked-marker");
        let cmd = stub_renderer(root.path(), &format!("touch {}\nexit 0", marker.display()));
        let opts = options(&root, cmd);
        std::fs::write(
            opts.source_dir.join("sys.puml"),
            "@startuml\n!include missing.iuml\n@enduml",
        )
        .unwrap();

        let err = render(&opts).unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedInclude { .. }));
        assert!(!marker.exists());
        assert!(!opts.output_dir.join("sys.svg").exists());
    }

    #[test]
    fn include_fragment_reaches_renderer_input() {
        let root = TempDir::new().unwrap();
        // Stub that copies stdin to stdout, so the image records the input
        let cmd = stub_renderer(root.path(), "cat");
        let opts = options(&root, cmd);
        std::fs::write(opts.include_dir.join("actors.iuml"), "actor Observer").unwrap();
        std::fs::write(
            opts.source_dir.join("sys.puml"),
            "@startuml\n!include actors.iuml\n@enduml",
        )
        .unwrap();

        let images = render(&opts).unwrap();
        let rendered = std::fs::read_to_string(&images[0]).unwrap();
        assert!(rendered.contains("actor Observer"));
        assert!(!rendered.contains("!include"));
    }

    #[test]
    fn keep_going_attempts_every_source() {
        let root = TempDir::new().unwrap();
        let opts = options(&root, ok_renderer(root.path()));
        std::fs::write(
            opts.source_dir.join("bad.puml"),
            "@startuml\n!include missing.iuml\n@enduml",
        )
        .unwrap();
        std::fs::write(opts.source_dir.join("good.puml"), "@startuml\n@enduml").unwrap();

        let outcome = render_all(&opts).unwrap();
        assert_eq!(outcome.rendered, vec![opts.output_dir.join("good.svg")]);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn missing_renderer_command_is_spawn_error() {
        let root = TempDir::new().unwrap();
        let opts = options(&root, "/nonexistent/plantuml".to_owned());
        std::fs::write(opts.source_dir.join("flow.puml"), "@startuml\n@enduml").unwrap();

        let err = render(&opts).unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }
}
