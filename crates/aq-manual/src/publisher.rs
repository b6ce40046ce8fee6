//! Publication of the compiled manual to its stable path.

use std::path::{Path, PathBuf};

/// Error returned by the publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The compiled document to publish does not exist.
    #[error("Compiled document not found: {}", path.display())]
    MissingDocument {
        /// The expected document path.
        path: PathBuf,
    },

    /// The copy to the publish path failed.
    #[error("Cannot publish {} to {}: {source}", from.display(), to.display())]
    Copy {
        /// Source document.
        from: PathBuf,
        /// Publish path.
        to: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Copies the compiled manual to a fixed, externally discoverable path.
///
/// The publish path is only ever written after a successful compile, and is
/// never pre-cleaned: a failed run leaves the previously published artifact
/// untouched.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    publish_path: PathBuf,
}

impl ArtifactPublisher {
    /// Create a publisher targeting `publish_path`.
    #[must_use]
    pub fn new(publish_path: PathBuf) -> Self {
        Self { publish_path }
    }

    /// The configured publish path.
    #[must_use]
    pub fn publish_path(&self) -> &Path {
        &self.publish_path
    }

    /// Copy `document` to the publish path. Single attempt, no retry.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the document is missing or the copy
    /// fails.
    pub fn publish(&self, document: &Path) -> Result<u64, PublishError> {
        if !document.is_file() {
            return Err(PublishError::MissingDocument {
                path: document.to_path_buf(),
            });
        }

        let copy_err = |source| PublishError::Copy {
            from: document.to_path_buf(),
            to: self.publish_path.clone(),
            source,
        };

        if let Some(parent) = self.publish_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(copy_err)?;
        }

        let bytes = std::fs::copy(document, &self.publish_path).map_err(copy_err)?;
        tracing::info!(
            artifact = %self.publish_path.display(),
            bytes,
            "Published manual"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn copies_document_to_publish_path() {
        let root = TempDir::new().unwrap();
        let pdf = root.path().join("build/latex/manual.pdf");
        std::fs::create_dir_all(pdf.parent().unwrap()).unwrap();
        std::fs::write(&pdf, "%PDF-1.4 content").unwrap();

        let publisher = ArtifactPublisher::new(root.path().join("manual.pdf"));
        let bytes = publisher.publish(&pdf).unwrap();
        assert_eq!(bytes, 16);
        assert_eq!(
            std::fs::read_to_string(publisher.publish_path()).unwrap(),
            "%PDF-1.4 content"
        );
    }

    #[test]
    fn overwrites_previous_artifact() {
        let root = TempDir::new().unwrap();
        let pdf = root.path().join("manual-new.pdf");
        std::fs::write(&pdf, "new").unwrap();
        let dest = root.path().join("manual.pdf");
        std::fs::write(&dest, "old").unwrap();

        ArtifactPublisher::new(dest.clone()).publish(&pdf).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn missing_document_is_an_error() {
        let root = TempDir::new().unwrap();
        let publisher = ArtifactPublisher::new(root.path().join("manual.pdf"));
        let err = publisher
            .publish(&root.path().join("absent.pdf"))
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingDocument { .. }));
        assert!(!root.path().join("manual.pdf").exists());
    }

    #[test]
    fn unwritable_target_reports_paths() {
        let root = TempDir::new().unwrap();
        let pdf = root.path().join("manual-new.pdf");
        std::fs::write(&pdf, "new").unwrap();
        // Publish path collides with an existing directory
        let dest = root.path().join("manual.pdf");
        std::fs::create_dir_all(&dest).unwrap();

        let err = ArtifactPublisher::new(dest.clone()).publish(&pdf).unwrap_err();
        match err {
            PublishError::Copy { to, .. } => assert_eq!(to, dest),
            other => panic!("unexpected error: {other}"),
        }
    }
}
