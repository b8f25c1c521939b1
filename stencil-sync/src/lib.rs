//! # stencil-sync
//!
//! Artifact synchronization engine: for every source unit a template
//! processes, keep exactly one generated file on disk, tracked in the
//! project with a `mapped_source` back-reference.
//!
//! Open a [`Template`] and call [`Template::render_to_file`],
//! [`Template::delete_artifact`] or [`Template::rename_artifact`] for single
//! events, or [`pipeline::run`] to render a whole project.

pub mod allocator;
pub mod diff;
pub mod error;
pub mod lookup;
pub mod mapping;
pub mod pipeline;
pub mod render;
pub mod status;
pub mod template;
pub mod tracker;
pub mod vcs;
pub mod writer;

pub use diff::{diff_template, ArtifactDiff, DiffKind};
pub use error::{SyncError, VcsError};
pub use pipeline::{RenderScope, TemplateRun};
pub use render::{NamingPolicy, SourceCatalog, SourceRenderer};
pub use status::{ArtifactReport, ArtifactStatus};
pub use template::{Template, TemplateParts};
pub use tracker::ContainerTracker;
pub use vcs::{CommandVersionControl, NoVersionControl, VersionControl};
pub use writer::{ArtifactResult, Reconciler};
