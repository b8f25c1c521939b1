//! Error types for stencil-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from project manifest and source operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No `stencil.yaml` at the expected location.
    #[error("project manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// The item is not tracked by the project (or was removed concurrently).
    #[error("item not tracked by the project: {path}")]
    ItemNotFound { path: PathBuf },

    /// The item is tracked but is not a template.
    #[error("not a template: {path}")]
    NotATemplate { path: PathBuf },

    /// Tracked items must live under the project root.
    #[error("{path} is outside the project root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Another template's scope already tracks the file.
    #[error("{path} is already tracked by template {owner}")]
    OwnedElsewhere { path: PathBuf, owner: PathBuf },

    /// The project does not expose the named attribute slot.
    #[error("project exposes no '{name}' attribute slot (item {item})")]
    MissingAttributeSlot { item: PathBuf, name: String },

    /// Invalid source glob pattern in template settings.
    #[error("invalid source pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Convenience constructor for [`ProjectError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ProjectError {
    ProjectError::Io {
        path: path.into(),
        source,
    }
}
