//! `!include` directive resolution for diagram sources.
//!
//! Diagram sources reference shared fragments with `!include <relpath>`,
//! resolved against the configured fragments directory. Resolution is
//! recursive with a bounded depth. `PlantUML` stdlib includes
//! (`!include <C4/C4_Container>`) are passed through untouched for the
//! renderer itself to handle.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::renderer::RenderError;

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*)!include\s+(.+)$").unwrap());

/// Maximum include nesting before resolution is aborted.
const MAX_INCLUDE_DEPTH: usize = 10;

/// Indent content with the given whitespace prefix, preserving empty lines.
fn indent_content(content: &str, indent: &str) -> String {
    if indent.is_empty() {
        return content.to_owned();
    }
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve all `!include` directives in `source` against `include_dir`.
///
/// `diagram` names the diagram source file being processed and is only used
/// for error reporting.
///
/// # Errors
///
/// Returns [`RenderError::UnresolvedInclude`] when a referenced fragment
/// does not exist and [`RenderError::IncludeDepth`] when nesting exceeds
/// the bound.
pub(crate) fn resolve_includes(
    source: &str,
    diagram: &Path,
    include_dir: &Path,
) -> Result<String, RenderError> {
    resolve_at_depth(source, diagram, include_dir, 0)
}

fn resolve_at_depth(
    source: &str,
    diagram: &Path,
    include_dir: &Path,
    depth: usize,
) -> Result<String, RenderError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(RenderError::IncludeDepth {
            diagram: diagram.to_path_buf(),
            max: MAX_INCLUDE_DEPTH,
        });
    }

    let mut result = source.to_owned();

    for caps in INCLUDE_PATTERN.captures_iter(source) {
        let full_match = caps.get(0).unwrap().as_str();
        let leading_whitespace = caps.get(1).unwrap().as_str();
        let include_path = caps.get(2).unwrap().as_str().trim();

        // Stdlib includes are the renderer's business
        if include_path.starts_with('<') && include_path.ends_with('>') {
            continue;
        }

        let fragment_path = include_dir.join(include_path);
        let content =
            std::fs::read_to_string(&fragment_path).map_err(|_| RenderError::UnresolvedInclude {
                diagram: diagram.to_path_buf(),
                include: include_path.to_owned(),
                searched: fragment_path.clone(),
            })?;

        let resolved = resolve_at_depth(&content, diagram, include_dir, depth + 1)?;
        // Indent included content to match the !include directive
        let indented = indent_content(&resolved, leading_whitespace);
        result = result.replace(full_match, &indented);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn diagram() -> PathBuf {
        PathBuf::from("system.puml")
    }

    #[test]
    fn source_without_includes_unchanged() {
        let source = "@startuml\nAlice -> Bob\n@enduml";
        let result = resolve_includes(source, &diagram(), Path::new("/nowhere")).unwrap();
        assert_eq!(result, source);
    }

    #[test]
    fn stdlib_include_passes_through() {
        let source = "@startuml\n!include <C4/C4_Container>\nAlice -> Bob\n@enduml";
        let result = resolve_includes(source, &diagram(), Path::new("/nowhere")).unwrap();
        assert!(result.contains("!include <C4/C4_Container>"));
    }

    #[test]
    fn missing_include_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = "@startuml\n!include missing.iuml\n@enduml";
        let err = resolve_includes(source, &diagram(), dir.path()).unwrap_err();
        match err {
            RenderError::UnresolvedInclude {
                include, searched, ..
            } => {
                assert_eq!(include, "missing.iuml");
                assert_eq!(searched, dir.path().join("missing.iuml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn include_resolved_from_fragments_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("actors.iuml"), "actor Observer").unwrap();

        let source = "@startuml\n!include actors.iuml\n@enduml";
        let result = resolve_includes(source, &diagram(), dir.path()).unwrap();
        assert!(result.contains("actor Observer"));
        assert!(!result.contains("!include"));
    }

    #[test]
    fn nested_includes_resolved() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inner.iuml"), "InnerContent").unwrap();
        std::fs::write(
            dir.path().join("outer.iuml"),
            "OuterBefore\n!include inner.iuml\nOuterAfter",
        )
        .unwrap();

        let source = "@startuml\n!include outer.iuml\n@enduml";
        let result = resolve_includes(source, &diagram(), dir.path()).unwrap();
        assert!(result.contains("OuterBefore"));
        assert!(result.contains("InnerContent"));
        assert!(result.contains("OuterAfter"));
    }

    #[test]
    fn indented_include_indents_fragment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("comp.iuml"), "Line1\n\nLine3").unwrap();

        let source = "@startuml\nbox \"Pipeline\"\n  !include comp.iuml\nend box\n@enduml";
        let result = resolve_includes(source, &diagram(), dir.path()).unwrap();
        // Empty lines stay empty, non-empty lines pick up the indent
        assert!(result.contains("  Line1\n\n  Line3"));
    }

    #[test]
    fn self_referencing_include_hits_depth_bound() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loop.iuml"), "!include loop.iuml").unwrap();

        let source = "@startuml\n!include loop.iuml\n@enduml";
        let err = resolve_includes(source, &diagram(), dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::IncludeDepth { .. }));
    }

    #[test]
    fn error_names_the_diagram() {
        let dir = tempfile::tempdir().unwrap();
        let source = "!include gone.iuml";
        let err = resolve_includes(source, Path::new("archive.puml"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("archive.puml"));
        assert!(err.to_string().contains("gone.iuml"));
    }
}
