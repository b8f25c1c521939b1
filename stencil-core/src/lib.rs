//! stencil core library: domain types, the project manifest and source enumeration.
//!
//! Public API surface:
//! - [`types`]: source units, tracked items, manifest and settings structs
//! - [`error`]: [`ProjectError`]
//! - [`project`]: the [`Project`] container: load / save / items / attributes
//! - [`sources`]: glob-based [`SourceScope`]
//! - [`paths`]: lexical path helpers shared with the sync engine

pub mod error;
pub mod paths;
pub mod project;
pub mod sources;
pub mod types;

pub use error::ProjectError;
pub use project::Project;
pub use sources::SourceScope;
pub use types::{
    ItemKind, Manifest, SourceUnit, TemplateSettings, TrackedItem, VcsSettings, MANIFEST_FILE,
    MAPPED_SOURCE,
};
