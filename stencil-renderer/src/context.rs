//! Template context: serializable rendering payload built from a [`SourceUnit`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use stencil_core::{paths, SourceUnit};

use crate::error::{io_err, RenderError};

/// Rendering payload for one source unit.
///
/// The nested `source` / `template` shape is what body templates use. The
/// flat `stem`, `file_name` and `extension` fields keep output-filename
/// expressions short (`"{{ stem | kebab_case }}.model"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContext {
    pub source: SourceCtx,
    pub template: TemplateCtx,

    pub stem: String,
    pub file_name: String,
    pub extension: String,
}

/// Facts about the source unit being rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCtx {
    /// Absolute path.
    pub path: String,
    /// Path relative to the project root, `/`-separated.
    pub relative_path: String,
    /// Root-relative directory, `/`-separated; empty at the root.
    pub directory: String,
    pub file_name: String,
    pub stem: String,
    pub extension: String,
    /// Full text of the source file; empty until [`SourceContext::with_content`].
    pub content: String,
    pub lines: Vec<String>,
}

/// Facts about the template doing the rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCtx {
    pub name: String,
    pub relative_path: String,
    pub stencil_version: String,
}

impl SourceContext {
    /// Build the path-derived part of the context. Does not read the source.
    pub fn new(root: &Path, template: &Path, source: &SourceUnit) -> Self {
        let relative = paths::relative_to(root, source.path());
        let directory = relative
            .parent()
            .map(paths::to_slash)
            .unwrap_or_default();
        let file_name = source.file_name().unwrap_or_default().to_string();
        let stem = source.stem().unwrap_or_default().to_string();
        let extension = source.extension().unwrap_or_default().to_string();

        SourceContext {
            source: SourceCtx {
                path: source.path().display().to_string(),
                relative_path: paths::to_slash(&relative),
                directory,
                file_name: file_name.clone(),
                stem: stem.clone(),
                extension: extension.clone(),
                content: String::new(),
                lines: Vec::new(),
            },
            template: TemplateCtx {
                name: template
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                relative_path: paths::to_slash(&paths::relative_to(root, template)),
                stencil_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            stem,
            file_name,
            extension,
        }
    }

    /// Read the source file into `source.content` / `source.lines`.
    pub fn with_content(mut self, source: &SourceUnit) -> Result<Self, RenderError> {
        let content =
            std::fs::read_to_string(source.path()).map_err(|e| io_err(source.path(), e))?;
        self.source.lines = content.lines().map(str::to_string).collect();
        self.source.content = content;
        Ok(self)
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn path_fields_populated() {
        let unit = SourceUnit::new("/code/app/src/Models/Customer.cs");
        let ctx = SourceContext::new(
            Path::new("/code/app"),
            Path::new("/code/app/templates/models.tera"),
            &unit,
        );
        assert_eq!(ctx.stem, "Customer");
        assert_eq!(ctx.file_name, "Customer.cs");
        assert_eq!(ctx.extension, "cs");
        assert_eq!(ctx.source.relative_path, "src/Models/Customer.cs");
        assert_eq!(ctx.source.directory, "src/Models");
        assert_eq!(ctx.template.name, "models.tera");
        assert_eq!(ctx.template.relative_path, "templates/models.tera");
        assert!(ctx.source.content.is_empty());
    }

    #[test]
    fn with_content_reads_source() {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("Foo.cs");
        std::fs::write(&path, "class Foo {}\nclass Bar {}\n").unwrap();
        let unit = SourceUnit::new(&path);

        let ctx = SourceContext::new(dir.path(), &dir.path().join("t.tera"), &unit)
            .with_content(&unit)
            .expect("read");
        assert_eq!(ctx.source.lines, vec!["class Foo {}", "class Bar {}"]);
        ctx.to_tera_context().expect("context conversion");
    }

    #[test]
    fn missing_source_is_io_error() {
        let unit = SourceUnit::new("/definitely/not/here.cs");
        let err = SourceContext::new(Path::new("/"), Path::new("/t.tera"), &unit)
            .with_content(&unit)
            .unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }
}
