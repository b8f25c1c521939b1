//! Tera rendering engine for a single template file.
//!
//! A [`TemplateEngine`] compiles one `.tera` template plus any `_`-prefixed
//! partials living next to it (available to `{% include %}`), and renders
//! it once per source unit. It also owns the template's output naming
//! policy: the optional `output_filename` expression and `output_extension`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use tera::{Tera, Value};

use stencil_core::{SourceUnit, TemplateSettings};

use crate::context::SourceContext;
use crate::error::{io_err, RenderError};

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// `_`-prefixed `.tera` files in `dir`, keyed by lowercase file name.
fn load_partials(dir: &Path, main: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut partials = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if path == main || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with('_') {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        partials.push((normalize_template_name(Path::new(name)), contents));
    }
    Ok(partials)
}

fn case_filter(convert: fn(&str) -> String) -> impl tera::Filter {
    move |value: &Value, _: &HashMap<String, Value>| -> tera::Result<Value> {
        let s = tera::try_get_value!("case", "value", String, value);
        Ok(Value::String(convert(&s)))
    }
}

fn register_filters(tera: &mut Tera) {
    tera.register_filter("pascal_case", case_filter(|s| s.to_upper_camel_case()));
    tera.register_filter("camel_case", case_filter(|s| s.to_lower_camel_case()));
    tera.register_filter("kebab_case", case_filter(|s| s.to_kebab_case()));
    tera.register_filter("snake_case", case_filter(|s| s.to_snake_case()));
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Compiled template plus its output naming policy.
pub struct TemplateEngine {
    tera: Tera,
    name: String,
    root: PathBuf,
    template: PathBuf,
    settings: TemplateSettings,
}

impl TemplateEngine {
    /// Load and compile the template at `template` (absolute) for a project
    /// rooted at `root`.
    pub fn load(
        root: &Path,
        template: &Path,
        settings: TemplateSettings,
    ) -> Result<Self, RenderError> {
        let body = std::fs::read_to_string(template).map_err(|e| io_err(template, e))?;
        let partials = match template.parent() {
            Some(dir) => load_partials(dir, template)?,
            None => vec![],
        };
        Self::build(root, template, &body, partials, settings)
    }

    /// Compile a template from in-memory text; `template` only names it.
    pub fn from_text(
        root: &Path,
        template: &Path,
        body: &str,
        settings: TemplateSettings,
    ) -> Result<Self, RenderError> {
        Self::build(root, template, body, vec![], settings)
    }

    fn build(
        root: &Path,
        template: &Path,
        body: &str,
        partials: Vec<(String, String)>,
        settings: TemplateSettings,
    ) -> Result<Self, RenderError> {
        let name = template
            .file_name()
            .map(|n| normalize_template_name(Path::new(n)))
            .unwrap_or_else(|| "template.tera".to_string());

        let mut tera = Tera::default();
        register_filters(&mut tera);
        let mut items = partials;
        items.push((name.clone(), body.to_string()));
        tera.add_raw_templates(items)?;

        Ok(TemplateEngine {
            tera,
            name,
            root: root.to_path_buf(),
            template: template.to_path_buf(),
            settings,
        })
    }

    /// Absolute path of the template file.
    pub fn template_path(&self) -> &Path {
        &self.template
    }

    pub fn settings(&self) -> &TemplateSettings {
        &self.settings
    }

    /// Render the template for `source`.
    ///
    /// Returns `Ok(None)` when the output is empty or whitespace-only, which
    /// means no artifact should exist for this source.
    pub fn render(&self, source: &SourceUnit) -> Result<Option<String>, RenderError> {
        let ctx = SourceContext::new(&self.root, &self.template, source).with_content(source)?;
        let text = self.tera.render(&self.name, &ctx.to_tera_context()?)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    /// Evaluate the `output_filename` expression for `source`, if one is
    /// configured.
    pub fn output_filename(&self, source: &SourceUnit) -> Option<Result<String, RenderError>> {
        let expr = self.settings.output_filename.as_deref()?;
        Some(self.eval_filename(expr, source))
    }

    /// Configured output extension, verbatim.
    pub fn output_extension(&self) -> Option<&str> {
        self.settings.output_extension.as_deref()
    }

    fn eval_filename(&self, expr: &str, source: &SourceUnit) -> Result<String, RenderError> {
        let ctx = SourceContext::new(&self.root, &self.template, source).to_tera_context()?;
        let mut tera = self.tera.clone();
        tera.add_raw_template("__output_filename", expr)?;
        let name = tera.render("__output_filename", &ctx)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RenderError::EmptyFilename {
                source_path: source.path().to_path_buf(),
            });
        }
        Ok(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, rel: &str, body: &str) -> SourceUnit {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        SourceUnit::new(path)
    }

    fn engine(dir: &TempDir, body: &str, settings: TemplateSettings) -> TemplateEngine {
        TemplateEngine::from_text(
            dir.path(),
            &dir.path().join("templates").join("models.tera"),
            body,
            settings,
        )
        .expect("compile")
    }

    #[test]
    fn renders_source_facts() {
        let dir = TempDir::new().unwrap();
        let unit = write_source(&dir, "src/Customer.cs", "class Customer {}\n");
        let eng = engine(
            &dir,
            "// {{ source.relative_path }}\nexport interface {{ stem }} {}\n",
            TemplateSettings::default(),
        );
        let out = eng.render(&unit).unwrap().expect("some output");
        assert_eq!(out, "// src/Customer.cs\nexport interface Customer {}\n");
    }

    #[test]
    fn whitespace_output_means_no_artifact() {
        let dir = TempDir::new().unwrap();
        let unit = write_source(&dir, "src/Empty.cs", "");
        let eng = engine(
            &dir,
            "{% if source.content %}x{% endif %}\n  \n",
            TemplateSettings::default(),
        );
        assert_eq!(eng.render(&unit).unwrap(), None);
    }

    #[test]
    fn syntax_error_fails_at_load() {
        let dir = TempDir::new().unwrap();
        let result = TemplateEngine::from_text(
            dir.path(),
            &dir.path().join("bad.tera"),
            "{% if %}",
            TemplateSettings::default(),
        );
        assert!(matches!(result, Err(RenderError::Tera(_))));
    }

    #[test]
    fn output_filename_uses_case_filters() {
        let dir = TempDir::new().unwrap();
        let unit = SourceUnit::new(dir.path().join("src/OrderLine.cs"));
        let eng = engine(
            &dir,
            "x",
            TemplateSettings {
                output_filename: Some("{{ stem | kebab_case }}.model.ts".to_string()),
                ..TemplateSettings::default()
            },
        );
        let name = eng.output_filename(&unit).expect("configured").expect("ok");
        assert_eq!(name, "order-line.model.ts");
    }

    #[test]
    fn output_filename_absent_when_not_configured() {
        let dir = TempDir::new().unwrap();
        let unit = SourceUnit::new(dir.path().join("src/Foo.cs"));
        let eng = engine(&dir, "x", TemplateSettings::default());
        assert!(eng.output_filename(&unit).is_none());
    }

    #[test]
    fn empty_output_filename_is_error() {
        let dir = TempDir::new().unwrap();
        let unit = SourceUnit::new(dir.path().join("src/Foo.cs"));
        let eng = engine(
            &dir,
            "x",
            TemplateSettings {
                output_filename: Some("{{ '' }}".to_string()),
                ..TemplateSettings::default()
            },
        );
        let err = eng.output_filename(&unit).expect("configured").unwrap_err();
        assert!(matches!(err, RenderError::EmptyFilename { .. }));
    }

    #[test]
    fn load_picks_up_partials() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("_header.tera"), "// generated from {{ file_name }}\n").unwrap();
        fs::write(
            templates.join("models.tera"),
            "{% include \"_header.tera\" %}export class {{ stem | pascal_case }} {}\n",
        )
        .unwrap();
        let unit = write_source(&dir, "src/order_line.cs", "class order_line {}");

        let eng = TemplateEngine::load(
            dir.path(),
            &templates.join("models.tera"),
            TemplateSettings::default(),
        )
        .expect("load");
        let out = eng.render(&unit).unwrap().expect("output");
        assert_eq!(
            out,
            "// generated from order_line.cs\nexport class OrderLine {}\n"
        );
    }
}
