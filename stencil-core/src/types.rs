//! Domain types for the stencil project manifest.
//!
//! Filesystem paths handed around at runtime are `PathBuf`. Item paths stored
//! in the manifest are root-relative strings with `/` separators so that a
//! manifest checked in on one platform loads unchanged on another.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the manifest file at the project root.
pub const MANIFEST_FILE: &str = "stencil.yaml";

/// Attribute holding an artifact's back-reference to its source unit.
pub const MAPPED_SOURCE: &str = "mapped_source";

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Source units
// ---------------------------------------------------------------------------

/// An input file processed by a template, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceUnit {
    path: PathBuf,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Absolute path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension (`Foo.cs`).
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// File name without its last extension (`Foo`).
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|n| n.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|n| n.to_str())
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.display().fmt(f)
    }
}

impl From<PathBuf> for SourceUnit {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}

impl From<&Path> for SourceUnit {
    fn from(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What a tracked item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A template file; its children are the artifacts it generated.
    Template,
    /// A generated output file owned by a template.
    Artifact,
    /// Any other tracked file.
    #[default]
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Template => write!(f, "template"),
            ItemKind::Artifact => write!(f, "artifact"),
            ItemKind::File => write!(f, "file"),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn default_pattern() -> String {
    "**/*.cs".to_string()
}

/// Per-template output and source-selection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Extension appended to default output names (`ts`, `.ts`). Defaults to `.ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_extension: Option<String>,
    /// Tera expression producing the output file name for a source unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
    /// Root-relative directories whose sources this template processes.
    /// Empty means the whole project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Glob matched against source paths relative to each included directory.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            output_extension: None,
            output_filename: None,
            include: Vec::new(),
            pattern: default_pattern(),
        }
    }
}

/// External commands used to cooperate with a checkout-based VCS.
///
/// The target path is appended as the last argument of each command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsSettings {
    /// Command that checks a file out for editing (e.g. `["p4", "edit"]`).
    pub checkout: Vec<String>,
    /// Command whose zero exit status means the file is under version control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A file tracked by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Root-relative path with `/` separators.
    pub path: String,
    #[serde(default)]
    pub kind: ItemKind,
    /// Only present on templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<TemplateSettings>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TrackedItem>,
}

impl TrackedItem {
    pub fn new(path: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            path: path.into(),
            kind,
            settings: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn template(path: impl Into<String>, settings: TemplateSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::new(path, ItemKind::Template)
        }
    }
}

fn default_attributes() -> BTreeSet<String> {
    BTreeSet::from([MAPPED_SOURCE.to_string()])
}

/// Root of the `stencil.yaml` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Attribute slots this project exposes on tracked items.
    #[serde(default = "default_attributes")]
    pub attributes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsSettings>,
    #[serde(default)]
    pub items: Vec<TrackedItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: MANIFEST_VERSION,
            attributes: default_attributes(),
            vcs: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
