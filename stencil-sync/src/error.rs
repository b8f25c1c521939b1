//! Error types for stencil-sync.

use std::path::PathBuf;

use thiserror::Error;

use stencil_core::ProjectError;
use stencil_renderer::RenderError;

/// All errors that can arise from artifact synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine. Nothing was written.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the project container.
    #[error("project error: {0}")]
    Project(#[from] ProjectError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required argument or attribute slot is missing.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Every `" (N)"` suffix up to the bound is taken by another source.
    #[error("no free output name for {source_path} after {attempts} attempts (last tried {last})")]
    CollisionExhausted {
        source_path: PathBuf,
        last: PathBuf,
        attempts: u32,
    },
}

/// Failure of a best-effort version-control call. Logged, never propagated.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("empty version-control command")]
    EmptyCommand,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
