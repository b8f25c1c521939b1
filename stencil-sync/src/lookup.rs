//! Artifact registry lookup over a template's direct children.
//!
//! A child whose metadata cannot be read right now (typically because another
//! template is mutating the manifest) is skipped, not reported.

use std::path::{Path, PathBuf};

use stencil_core::paths;

use crate::error::SyncError;
use crate::mapping;
use crate::tracker::ContainerTracker;

/// Artifact in `scope` whose mapping equals `source` (case-insensitive).
pub fn find_by_source_path(
    tracker: &dyn ContainerTracker,
    scope: &Path,
    source: &Path,
) -> Result<Option<PathBuf>, SyncError> {
    for child in tracker.children(scope)? {
        match mapping::mapped_source(tracker, &child) {
            Ok(Some(mapped)) if paths::eq_ignore_case(&mapped, source) => {
                return Ok(Some(child));
            }
            Ok(_) => {}
            Err(err) => tracing::debug!("skipping {}: {err}", child.display()),
        }
    }
    Ok(None)
}

/// Artifact in `scope` stored at `output` (case-insensitive).
pub fn find_by_output_path(
    tracker: &dyn ContainerTracker,
    scope: &Path,
    output: &Path,
) -> Result<Option<PathBuf>, SyncError> {
    Ok(tracker
        .children(scope)?
        .into_iter()
        .find(|child| paths::eq_ignore_case(child, output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stencil_core::{Project, TemplateSettings, MAPPED_SOURCE};
    use tempfile::TempDir;

    fn setup(dir: &TempDir, names: &[(&str, Option<&str>)]) -> (Project, PathBuf) {
        let project = Project::init_at(dir.path()).unwrap();
        let template = project
            .add_template(Path::new("templates/models.tera"), TemplateSettings::default())
            .unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        for (name, source) in names {
            let file = dir.path().join("templates").join(name);
            fs::write(&file, "x").unwrap();
            project.add_child(&template, &file).unwrap();
            if let Some(source) = source {
                project.set_attribute(&file, MAPPED_SOURCE, source).unwrap();
            }
        }
        (project, template)
    }

    #[test]
    fn finds_by_source_ignoring_case() {
        let dir = TempDir::new().unwrap();
        let (project, template) = setup(
            &dir,
            &[("Foo.ts", Some("src/Foo.cs")), ("Bar.ts", Some("src/Bar.cs"))],
        );
        let found =
            find_by_source_path(&project, &template, &dir.path().join("SRC/bar.CS")).unwrap();
        assert_eq!(found, Some(dir.path().join("templates/Bar.ts")));
    }

    #[test]
    fn unmapped_children_never_match_by_source() {
        let dir = TempDir::new().unwrap();
        let (project, template) = setup(&dir, &[("Foo.ts", None)]);
        let found =
            find_by_source_path(&project, &template, &dir.path().join("src/Foo.cs")).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn finds_by_output_ignoring_case() {
        let dir = TempDir::new().unwrap();
        let (project, template) = setup(&dir, &[("Foo.ts", None)]);
        let found =
            find_by_output_path(&project, &template, &dir.path().join("templates/FOO.ts"))
                .unwrap();
        assert_eq!(found, Some(dir.path().join("templates/Foo.ts")));
        assert_eq!(
            find_by_output_path(&project, &template, &dir.path().join("templates/Baz.ts"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn unknown_scope_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (project, _) = setup(&dir, &[]);
        let err = find_by_output_path(&project, &dir.path().join("nope.tera"), dir.path())
            .unwrap_err();
        assert!(matches!(err, SyncError::Project(_)));
    }
}
