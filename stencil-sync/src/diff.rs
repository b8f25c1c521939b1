//! Dry-run unified diff support for `stencil diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use stencil_core::{paths, SourceUnit};

use crate::error::{io_err, SyncError};
use crate::template::Template;

/// What rendering a source would do to its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Create,
    Modify,
    Delete,
}

/// A single pending artifact change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDiff {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub kind: DiffKind,
    pub unified_diff: String,
}

/// Render every source of `template` and compare it to the artifacts on disk.
///
/// No files are written and the manifest is not touched. Headers are
/// relative to `root`.
pub fn diff_template(template: &Template, root: &Path) -> Result<Vec<ArtifactDiff>, SyncError> {
    let mut diffs = Vec::new();
    for source in template.source_units()? {
        let unit = SourceUnit::new(source);
        if let Some(diff) = diff_source(template, root, &unit)? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Pending change for a single source, or `None` when it is up to date.
pub fn diff_source(
    template: &Template,
    root: &Path,
    unit: &SourceUnit,
) -> Result<Option<ArtifactDiff>, SyncError> {
    let (artifact, rendered, kind) = match template.render(unit)? {
        Some(rendered) => {
            let artifact = template.planned_path(unit)?;
            let kind = if artifact.exists() {
                DiffKind::Modify
            } else {
                DiffKind::Create
            };
            (artifact, rendered, kind)
        }
        None => match template.artifact_for(unit.path())? {
            Some(artifact) => (artifact, String::new(), DiffKind::Delete),
            None => return Ok(None),
        },
    };

    let existing = read_existing_or_empty(&artifact)?;
    if kind == DiffKind::Modify && existing == rendered {
        return Ok(None);
    }

    let relative = paths::to_slash(&paths::relative_to(root, &artifact));
    let old_header = format!("a/{relative}");
    let new_header = format!("b/{relative}");
    let unified = TextDiff::from_lines(&existing, &rendered)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();

    Ok(Some(ArtifactDiff {
        source: unit.path().to_path_buf(),
        artifact,
        kind,
        unified_diff: unified,
    }))
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
