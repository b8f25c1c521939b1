//! Output path allocation with deterministic collision resolution.
//!
//! The base name comes from the naming policy (or `<stem><extension>`), is
//! placed next to the template, and gets a `" (N)"` suffix while the path is
//! held by an artifact mapped to a different source or tracked by another
//! template.

use std::path::{Path, PathBuf};

use stencil_core::{paths, SourceUnit};

use crate::error::SyncError;
use crate::lookup;
use crate::mapping;
use crate::render::NamingPolicy;
use crate::tracker::ContainerTracker;

/// Upper bound on candidate names tried for one source.
pub const MAX_COLLISION_ATTEMPTS: u32 = 999;

/// Extension used when the template configures none.
pub const DEFAULT_EXTENSION: &str = ".ts";

/// `ts`, `.ts` and `..ts` all become `.ts`; blank means [`DEFAULT_EXTENSION`].
pub fn normalize_extension(ext: Option<&str>) -> String {
    match ext.map(|e| e.trim().trim_start_matches('.')) {
        Some(e) if !e.is_empty() => format!(".{e}"),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Split a file name into stem and extension; `.d.ts`-style names keep the
/// compound extension together.
pub fn split_extension(name: &str) -> (&str, &str) {
    let Some(dot) = name.rfind('.').filter(|&i| i > 0) else {
        return (name, "");
    };
    let stem = &name[..dot];
    if let Some(inner) = stem.len().checked_sub(2).filter(|&i| i > 0) {
        if stem.get(inner..).is_some_and(|tail| tail.eq_ignore_ascii_case(".d")) {
            return name.split_at(inner);
        }
    }
    name.split_at(dot)
}

/// `Foo.d.ts` + 2 → `Foo (2).d.ts`.
pub fn with_suffix(name: &str, n: u32) -> String {
    let (stem, ext) = split_extension(name);
    format!("{stem} ({n}){ext}")
}

/// File name for `source` before collision resolution.
///
/// A failing or unusable naming policy is logged and replaced by the
/// default `<stem><extension>`.
pub fn base_file_name(source: &SourceUnit, naming: &dyn NamingPolicy) -> String {
    let ext = normalize_extension(naming.output_extension().as_deref());
    match naming.output_filename(source) {
        Some(Ok(name)) if name.contains(['/', '\\']) => {
            tracing::warn!(
                "output file name {name:?} for {source} contains a path separator; using default name"
            );
        }
        Some(Ok(name)) => {
            if name.to_lowercase().ends_with(&ext.to_lowercase()) {
                return name;
            }
            return format!("{name}{ext}");
        }
        Some(Err(err)) => {
            tracing::warn!("output file name for {source} failed: {err}; using default name");
        }
        None => {}
    }
    let stem = source
        .stem()
        .filter(|s| !s.is_empty())
        .or_else(|| source.file_name())
        .unwrap_or("output");
    format!("{stem}{ext}")
}

/// Compute the output path for `source` among the artifacts of `scope`.
///
/// The returned path is either free, or held by an artifact that is unmapped
/// or already mapped to `source` (in which case the tracked path is returned
/// verbatim).
pub fn allocate(
    tracker: &dyn ContainerTracker,
    scope: &Path,
    source: &SourceUnit,
    naming: &dyn NamingPolicy,
) -> Result<PathBuf, SyncError> {
    let dir = scope.parent().unwrap_or_else(|| tracker.root());
    let base = base_file_name(source, naming);
    let mut candidate = dir.join(&base);

    for attempt in 1..=MAX_COLLISION_ATTEMPTS {
        match lookup::find_by_output_path(tracker, scope, &candidate)? {
            Some(existing) => match mapping::mapped_source(tracker, &existing) {
                Ok(None) => return Ok(existing),
                Ok(Some(mapped)) if paths::eq_ignore_case(&mapped, source.path()) => {
                    return Ok(existing)
                }
                Ok(Some(_)) => {}
                Err(err) => tracing::debug!("treating {} as taken: {err}", existing.display()),
            },
            None => match tracker.owner(&candidate)? {
                Some(owner) => tracing::debug!(
                    "{} is tracked by {}; trying next name",
                    candidate.display(),
                    owner.display()
                ),
                None => return Ok(candidate),
            },
        }
        candidate = dir.join(with_suffix(&base, attempt));
    }

    Err(SyncError::CollisionExhausted {
        source_path: source.path().to_path_buf(),
        last: candidate,
        attempts: MAX_COLLISION_ATTEMPTS,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use stencil_core::{Project, TemplateSettings, MAPPED_SOURCE};
    use stencil_renderer::RenderError;
    use tempfile::TempDir;

    struct Policy {
        name: Option<&'static str>,
        fails: bool,
        ext: Option<&'static str>,
    }

    impl NamingPolicy for Policy {
        fn output_filename(&self, source: &SourceUnit) -> Option<Result<String, RenderError>> {
            if self.fails {
                return Some(Err(RenderError::EmptyFilename {
                    source_path: source.path().to_path_buf(),
                }));
            }
            self.name.map(|n| Ok(n.to_string()))
        }

        fn output_extension(&self) -> Option<String> {
            self.ext.map(str::to_string)
        }
    }

    const DEFAULT: Policy = Policy {
        name: None,
        fails: false,
        ext: None,
    };

    #[rstest]
    #[case(None, ".ts")]
    #[case(Some(""), ".ts")]
    #[case(Some("ts"), ".ts")]
    #[case(Some(".d.ts"), ".d.ts")]
    #[case(Some("..cs"), ".cs")]
    fn extension_normalization(#[case] input: Option<&str>, #[case] expected: &str) {
        assert_eq!(normalize_extension(input), expected);
    }

    #[rstest]
    #[case("Foo.ts", "Foo", ".ts")]
    #[case("Foo.d.ts", "Foo", ".d.ts")]
    #[case("Foo.D.TS", "Foo", ".D.TS")]
    #[case("Foo", "Foo", "")]
    #[case(".d.ts", ".d", ".ts")]
    #[case("a.b.c", "a.b", ".c")]
    fn extension_split(#[case] name: &str, #[case] stem: &str, #[case] ext: &str) {
        assert_eq!(split_extension(name), (stem, ext));
    }

    #[rstest]
    #[case("Foo.ts", 1, "Foo (1).ts")]
    #[case("Foo.d.ts", 2, "Foo (2).d.ts")]
    #[case("Makefile", 3, "Makefile (3)")]
    fn suffixing(#[case] name: &str, #[case] n: u32, #[case] expected: &str) {
        assert_eq!(with_suffix(name, n), expected);
    }

    #[test]
    fn default_name_uses_source_stem() {
        let unit = SourceUnit::new("/p/src/Customer.cs");
        assert_eq!(base_file_name(&unit, &DEFAULT), "Customer.ts");
        let policy = Policy {
            ext: Some("js"),
            ..DEFAULT
        };
        assert_eq!(base_file_name(&unit, &policy), "Customer.js");
    }

    #[test]
    fn policy_name_gets_extension_when_missing() {
        let unit = SourceUnit::new("/p/src/Customer.cs");
        let policy = Policy {
            name: Some("customer.model"),
            ..DEFAULT
        };
        assert_eq!(base_file_name(&unit, &policy), "customer.model.ts");
        let policy = Policy {
            name: Some("customer.TS"),
            ..DEFAULT
        };
        assert_eq!(base_file_name(&unit, &policy), "customer.TS");
    }

    #[test]
    fn failing_policy_falls_back_to_default() {
        let unit = SourceUnit::new("/p/src/Customer.cs");
        let policy = Policy {
            fails: true,
            ..DEFAULT
        };
        assert_eq!(base_file_name(&unit, &policy), "Customer.ts");
        let policy = Policy {
            name: Some("../escape.ts"),
            ..DEFAULT
        };
        assert_eq!(base_file_name(&unit, &policy), "Customer.ts");
    }

    fn project(dir: &TempDir) -> (Project, PathBuf) {
        let project = Project::init_at(dir.path()).unwrap();
        let template = project
            .add_template(Path::new("templates/models.tera"), TemplateSettings::default())
            .unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        (project, template)
    }

    fn track(project: &Project, template: &Path, file: &Path, source: Option<&str>) {
        fs::write(file, "x").unwrap();
        project.add_child(template, file).unwrap();
        if let Some(source) = source {
            project.set_attribute(file, MAPPED_SOURCE, source).unwrap();
        }
    }

    #[test]
    fn free_path_is_accepted() {
        let dir = TempDir::new().unwrap();
        let (project, template) = project(&dir);
        let unit = SourceUnit::new(dir.path().join("src/Foo.cs"));
        let path = allocate(&project, &template, &unit, &DEFAULT).unwrap();
        assert_eq!(path, dir.path().join("templates/Foo.ts"));
    }

    #[test]
    fn same_source_and_unmapped_reuse_the_path() {
        let dir = TempDir::new().unwrap();
        let (project, template) = project(&dir);
        let foo = dir.path().join("templates/Foo.ts");
        track(&project, &template, &foo, Some("src/Foo.cs"));
        let bar = dir.path().join("templates/Bar.ts");
        track(&project, &template, &bar, None);

        let unit = SourceUnit::new(dir.path().join("src/foo.CS"));
        let policy = Policy {
            name: Some("foo.ts"),
            ..DEFAULT
        };
        assert_eq!(allocate(&project, &template, &unit, &policy).unwrap(), foo);

        let unit = SourceUnit::new(dir.path().join("other/Bar.cs"));
        assert_eq!(allocate(&project, &template, &unit, &DEFAULT).unwrap(), bar);
    }

    #[test]
    fn collisions_take_the_next_suffix() {
        let dir = TempDir::new().unwrap();
        let (project, template) = project(&dir);
        track(
            &project,
            &template,
            &dir.path().join("templates/Foo.ts"),
            Some("a/Foo.cs"),
        );
        track(
            &project,
            &template,
            &dir.path().join("templates/Foo (1).ts"),
            Some("b/Foo.cs"),
        );

        let unit = SourceUnit::new(dir.path().join("c/Foo.cs"));
        let path = allocate(&project, &template, &unit, &DEFAULT).unwrap();
        assert_eq!(path, dir.path().join("templates/Foo (2).ts"));

        let unit = SourceUnit::new(dir.path().join("b/Foo.cs"));
        let path = allocate(&project, &template, &unit, &DEFAULT).unwrap();
        assert_eq!(path, dir.path().join("templates/Foo (1).ts"));
    }

    #[test]
    fn declaration_files_suffix_before_compound_extension() {
        let dir = TempDir::new().unwrap();
        let (project, template) = project(&dir);
        track(
            &project,
            &template,
            &dir.path().join("templates/Foo.d.ts"),
            Some("a/Foo.cs"),
        );
        let policy = Policy {
            ext: Some("d.ts"),
            ..DEFAULT
        };
        let unit = SourceUnit::new(dir.path().join("b/Foo.cs"));
        let path = allocate(&project, &template, &unit, &policy).unwrap();
        assert_eq!(path, dir.path().join("templates/Foo (1).d.ts"));
    }

    #[test]
    fn path_tracked_by_another_template_is_taken() {
        let dir = TempDir::new().unwrap();
        let (project, models) = project(&dir);
        let clients = project
            .add_template(Path::new("templates/clients.tera"), TemplateSettings::default())
            .unwrap();
        track(
            &project,
            &models,
            &dir.path().join("templates/Foo.ts"),
            Some("a/Foo.cs"),
        );

        let unit = SourceUnit::new(dir.path().join("b/Foo.cs"));
        let path = allocate(&project, &clients, &unit, &DEFAULT).unwrap();
        assert_eq!(path, dir.path().join("templates/Foo (1).ts"));
    }

    /// Scope whose children all map to distinct foreign sources.
    struct Crowded {
        root: PathBuf,
        taken: Vec<PathBuf>,
    }

    impl Crowded {
        fn new(suffixed: u32) -> Self {
            let root = PathBuf::from("/p");
            let dir = root.join("templates");
            let mut taken = vec![dir.join("Foo.ts")];
            taken.extend((1..=suffixed).map(|n| dir.join(format!("Foo ({n}).ts"))));
            Self { root, taken }
        }
    }

    impl ContainerTracker for Crowded {
        fn root(&self) -> &Path {
            &self.root
        }

        fn children(&self, _scope: &Path) -> Result<Vec<PathBuf>, stencil_core::ProjectError> {
            Ok(self.taken.clone())
        }

        fn add_from_file(
            &self,
            _scope: &Path,
            file: &Path,
        ) -> Result<PathBuf, stencil_core::ProjectError> {
            Ok(file.to_path_buf())
        }

        fn remove(&self, _item: &Path) -> Result<(), stencil_core::ProjectError> {
            Ok(())
        }

        fn rename(&self, item: &Path, new_name: &str) -> Result<PathBuf, stencil_core::ProjectError> {
            Ok(item.with_file_name(new_name))
        }

        fn owner(&self, _item: &Path) -> Result<Option<PathBuf>, stencil_core::ProjectError> {
            Ok(None)
        }

        fn supports_attribute(&self, _name: &str) -> bool {
            true
        }

        fn attribute(
            &self,
            item: &Path,
            _name: &str,
        ) -> Result<Option<String>, stencil_core::ProjectError> {
            let name = item.file_name().unwrap().to_string_lossy();
            Ok(Some(format!("elsewhere/{name}.cs")))
        }

        fn set_attribute(
            &self,
            _item: &Path,
            _name: &str,
            _value: &str,
        ) -> Result<(), stencil_core::ProjectError> {
            Ok(())
        }

        fn save(&self) -> Result<(), stencil_core::ProjectError> {
            Ok(())
        }
    }

    #[test]
    fn collision_loop_gives_up_after_the_cap() {
        let scope = Path::new("/p/templates/models.tera");
        let unit = SourceUnit::new("/p/src/Foo.cs");

        let tracker = Crowded::new(MAX_COLLISION_ATTEMPTS - 2);
        let path = allocate(&tracker, scope, &unit, &DEFAULT).unwrap();
        assert_eq!(path, PathBuf::from("/p/templates/Foo (998).ts"));

        let tracker = Crowded::new(MAX_COLLISION_ATTEMPTS - 1);
        let err = allocate(&tracker, scope, &unit, &DEFAULT).unwrap_err();
        match err {
            SyncError::CollisionExhausted {
                attempts,
                last,
                source_path,
            } => {
                assert_eq!(attempts, 999);
                assert_eq!(last, PathBuf::from("/p/templates/Foo (999).ts"));
                assert_eq!(source_path, PathBuf::from("/p/src/Foo.cs"));
            }
            other => panic!("expected CollisionExhausted, got {other:?}"),
        }
    }
}
