//! Rendering and source-enumeration seams.
//!
//! The engine only needs three capabilities from the template side: turn a
//! source unit into text, name the output file, and enumerate the sources a
//! template processes. [`TemplateEngine`] and [`SourceScope`] provide the
//! production implementations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use stencil_core::{ProjectError, SourceScope, SourceUnit};
use stencil_renderer::{RenderError, TemplateEngine};

/// Turns a source unit into generated text.
pub trait SourceRenderer: Send + Sync {
    /// `Ok(None)` means no artifact should exist for `source`.
    fn render(&self, source: &SourceUnit) -> Result<Option<String>, RenderError>;
}

/// Output naming policy of a template.
pub trait NamingPolicy: Send + Sync {
    /// Custom file name for `source`, or `None` to use the default naming.
    fn output_filename(&self, source: &SourceUnit) -> Option<Result<String, RenderError>>;

    /// Configured output extension, as written in the settings.
    fn output_extension(&self) -> Option<String>;
}

/// The set of source units a template processes.
pub trait SourceCatalog: Send + Sync {
    fn list(&self) -> Result<BTreeSet<PathBuf>, ProjectError>;

    fn contains(&self, path: &Path) -> bool;
}

impl SourceRenderer for TemplateEngine {
    fn render(&self, source: &SourceUnit) -> Result<Option<String>, RenderError> {
        TemplateEngine::render(self, source)
    }
}

impl NamingPolicy for TemplateEngine {
    fn output_filename(&self, source: &SourceUnit) -> Option<Result<String, RenderError>> {
        TemplateEngine::output_filename(self, source)
    }

    fn output_extension(&self) -> Option<String> {
        TemplateEngine::output_extension(self).map(str::to_string)
    }
}

impl SourceCatalog for SourceScope {
    fn list(&self) -> Result<BTreeSet<PathBuf>, ProjectError> {
        SourceScope::list(self)
    }

    fn contains(&self, path: &Path) -> bool {
        SourceScope::contains(self, path)
    }
}
