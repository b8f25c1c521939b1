use std::path::Path;
use std::time::Duration;

use stencil_core::MANIFEST_FILE;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Suffix of in-flight artifact writes.
pub const ARTIFACT_TMP_SUFFIX: &str = ".stencil.tmp";

/// Directories never worth reacting to.
const IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", "target", "node_modules", "bin", "obj"];

/// Whether an event on `path` should be dropped before dispatch.
///
/// Covers the manifest and its temp file, in-flight artifact writes, and
/// anything under a VCS or build directory inside `root`.
pub fn is_ignored(path: &Path, root: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return true;
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name == MANIFEST_FILE || name == format!("{MANIFEST_FILE}.tmp") {
        return true;
    }
    if name.ends_with(ARTIFACT_TMP_SUFFIX) {
        return true;
    }
    rel.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|part| IGNORED_DIRS.contains(&part))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_and_temp_files_are_ignored() {
        let root = Path::new("/proj");
        assert!(is_ignored(Path::new("/proj/stencil.yaml"), root));
        assert!(is_ignored(Path::new("/proj/stencil.yaml.tmp"), root));
        assert!(is_ignored(
            Path::new("/proj/templates/Foo.ts.stencil.tmp"),
            root
        ));
    }

    #[test]
    fn vcs_and_build_dirs_are_ignored() {
        let root = Path::new("/proj");
        assert!(is_ignored(Path::new("/proj/.git/index"), root));
        assert!(is_ignored(Path::new("/proj/src/obj/Debug/Foo.cs"), root));
        assert!(is_ignored(Path::new("/elsewhere/Foo.cs"), root));
    }

    #[test]
    fn sources_pass_through() {
        let root = Path::new("/proj");
        assert!(!is_ignored(Path::new("/proj/src/Models/Foo.cs"), root));
        assert!(!is_ignored(Path::new("/proj/templates/models.tera"), root));
    }
}
