//! Source enumeration: which files a template processes.
//!
//! A [`SourceScope`] is built from a template's `include` directories and
//! glob `pattern`. Matching is case-insensitive and `*` never crosses a
//! directory separator.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{io_err, ProjectError};
use crate::paths::{normalize, resolve};
use crate::types::TemplateSettings;

const GLOB_OPTS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The set of source units a template is allowed to process.
#[derive(Debug, Clone)]
pub struct SourceScope {
    include: Vec<PathBuf>,
    pattern: Pattern,
}

impl SourceScope {
    /// Build a scope from template settings; `include` entries resolve
    /// against `root`, an empty list means the whole project.
    pub fn from_settings(root: &Path, settings: &TemplateSettings) -> Result<Self, ProjectError> {
        let pattern = Pattern::new(&settings.pattern).map_err(|source| ProjectError::Pattern {
            pattern: settings.pattern.clone(),
            source,
        })?;
        let include = if settings.include.is_empty() {
            vec![normalize(root)]
        } else {
            settings
                .include
                .iter()
                .map(|dir| resolve(root, dir))
                .collect()
        };
        Ok(Self { include, pattern })
    }

    /// Directories searched for sources.
    pub fn include(&self) -> &[PathBuf] {
        &self.include
    }

    /// Enumerate every matching file under the included directories.
    pub fn list(&self) -> Result<BTreeSet<PathBuf>, ProjectError> {
        let mut found = BTreeSet::new();
        for dir in &self.include {
            let full = dir.join(self.pattern.as_str());
            let full = full.to_string_lossy();
            let entries =
                glob::glob_with(&full, GLOB_OPTS).map_err(|source| ProjectError::Pattern {
                    pattern: full.to_string(),
                    source,
                })?;
            for entry in entries {
                let path = entry.map_err(|err| {
                    let path = err.path().to_path_buf();
                    io_err(path, err.into_error())
                })?;
                if path.is_file() {
                    found.insert(normalize(&path));
                }
            }
        }
        Ok(found)
    }

    /// Whether `path` lies in an included directory and matches the pattern.
    pub fn contains(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.include.iter().any(|dir| {
            path.strip_prefix(dir)
                .map(|rel| self.pattern.matches_path_with(rel, GLOB_OPTS))
                .unwrap_or(false)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
