//! Mapping store: the `mapped_source` back-reference on each artifact.
//!
//! The value is the source path relative to the container root, written with
//! host separators. Reads accept either separator, so a manifest written on
//! one OS resolves on another.

use std::path::{Path, PathBuf};

use stencil_core::{paths, ProjectError, MAPPED_SOURCE};

use crate::error::SyncError;
use crate::tracker::ContainerTracker;

/// Encode `source` relative to `root` for storage.
pub fn encode(root: &Path, source: &Path) -> String {
    paths::relative_to(root, source).to_string_lossy().into_owned()
}

/// Decode a stored mapping back to an absolute path.
pub fn decode(root: &Path, stored: &str) -> PathBuf {
    paths::resolve(root, stored)
}

/// Source unit recorded for `artifact`, or `None` when unmapped.
pub fn mapped_source(
    tracker: &dyn ContainerTracker,
    artifact: &Path,
) -> Result<Option<PathBuf>, ProjectError> {
    let stored = tracker.attribute(artifact, MAPPED_SOURCE)?;
    Ok(stored
        .filter(|value| !value.trim().is_empty())
        .map(|value| decode(tracker.root(), &value)))
}

/// Record `source` as the origin of `artifact`.
///
/// A stored value that already matches (ignoring case) is left alone.
pub fn set_mapped_source(
    tracker: &dyn ContainerTracker,
    artifact: &Path,
    source: &Path,
) -> Result<(), SyncError> {
    if artifact.as_os_str().is_empty() {
        return Err(SyncError::Integrity("artifact path is empty".to_string()));
    }
    if source.as_os_str().is_empty() {
        return Err(SyncError::Integrity(format!(
            "empty source path for {}",
            artifact.display()
        )));
    }
    ensure_slot(tracker)?;

    let value = encode(tracker.root(), source);
    if let Some(current) = tracker.attribute(artifact, MAPPED_SOURCE)? {
        if paths::eq_ignore_case(Path::new(&current), Path::new(&value)) {
            return Ok(());
        }
    }
    tracker
        .set_attribute(artifact, MAPPED_SOURCE, &value)
        .map_err(|err| match err {
            ProjectError::MissingAttributeSlot { item, name } => SyncError::Integrity(format!(
                "{} has no {name} attribute slot",
                item.display()
            )),
            other => SyncError::Project(other),
        })
}

/// Fail unless the container exposes a `mapped_source` slot.
pub(crate) fn ensure_slot(tracker: &dyn ContainerTracker) -> Result<(), SyncError> {
    if tracker.supports_attribute(MAPPED_SOURCE) {
        Ok(())
    } else {
        Err(SyncError::Integrity(format!(
            "container at {} declares no {MAPPED_SOURCE} attribute slot",
            tracker.root().display()
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stencil_core::{Project, TemplateSettings};
    use tempfile::TempDir;

    fn tracked_artifact(dir: &TempDir) -> (Project, PathBuf) {
        let project = Project::init_at(dir.path()).unwrap();
        let template = project
            .add_template(Path::new("templates/models.tera"), TemplateSettings::default())
            .unwrap();
        let file = dir.path().join("templates").join("Foo.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "x").unwrap();
        project.add_child(&template, &file).unwrap();
        (project, file)
    }

    #[test]
    fn unmapped_artifact_reads_none() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        assert_eq!(mapped_source(&project, &file).unwrap(), None);

        project.set_attribute(&file, MAPPED_SOURCE, "   ").unwrap();
        assert_eq!(mapped_source(&project, &file).unwrap(), None);
    }

    #[test]
    fn mapping_is_stored_relative_and_read_back_absolute() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        let source = dir.path().join("src").join("Models").join("Foo.cs");

        set_mapped_source(&project, &file, &source).unwrap();

        let stored = project.attribute(&file, MAPPED_SOURCE).unwrap().unwrap();
        assert_eq!(Path::new(&stored), Path::new("src").join("Models").join("Foo.cs"));
        assert_eq!(mapped_source(&project, &file).unwrap(), Some(source));
    }

    #[test]
    fn case_only_difference_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        project
            .set_attribute(&file, MAPPED_SOURCE, "SRC/foo.cs")
            .unwrap();

        set_mapped_source(&project, &file, &dir.path().join("src").join("Foo.cs")).unwrap();
        assert_eq!(
            project.attribute(&file, MAPPED_SOURCE).unwrap().as_deref(),
            Some("SRC/foo.cs")
        );
    }

    #[test]
    fn backslash_mapping_resolves() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        project
            .set_attribute(&file, MAPPED_SOURCE, r"src\Models\Foo.cs")
            .unwrap();
        assert_eq!(
            mapped_source(&project, &file).unwrap(),
            Some(dir.path().join("src/Models/Foo.cs"))
        );
    }

    #[test]
    fn empty_source_is_integrity_error() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        let err = set_mapped_source(&project, &file, Path::new("")).unwrap_err();
        assert!(matches!(err, SyncError::Integrity(_)));
    }

    #[test]
    fn missing_slot_is_integrity_error() {
        let dir = TempDir::new().unwrap();
        let (project, file) = tracked_artifact(&dir);
        let mut manifest = project.manifest();
        manifest.attributes.clear();
        let project = Project::from_manifest(dir.path(), manifest);

        let err = set_mapped_source(&project, &file, &dir.path().join("src/Foo.cs")).unwrap_err();
        assert!(matches!(err, SyncError::Integrity(_)));
    }

    #[test]
    fn encode_decode_round_trip() {
        let root = Path::new("/proj/app");
        for source in ["/proj/app/src/A.cs", "/proj/shared/B.cs", "/proj/app/C.cs"] {
            let stored = encode(root, Path::new(source));
            assert_eq!(decode(root, &stored), PathBuf::from(source));
        }
    }
}
