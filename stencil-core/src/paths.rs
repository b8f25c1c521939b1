//! Lexical path helpers shared by the manifest and the mapping store.
//!
//! Nothing here touches the filesystem: paths are compared and rebased purely
//! by their components, so results are stable for files that no longer exist.

use std::path::{Component, Path, PathBuf};

/// Drop `.` components and fold `..` into the preceding component.
///
/// `..` directly under a root is discarded; leading `..` of a relative path
/// is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `path` relative to `base` using host separators.
///
/// Returns `path` unchanged (normalized) when the two share no root, e.g.
/// different drives on Windows.
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    let base = normalize(base);
    let path = normalize(path);
    let base_comps: Vec<Component<'_>> = base.components().collect();
    let path_comps: Vec<Component<'_>> = path.components().collect();

    let common = base_comps
        .iter()
        .zip(&path_comps)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && path.is_absolute() {
        return path;
    }

    let mut rel = PathBuf::new();
    for _ in common..base_comps.len() {
        rel.push("..");
    }
    for comp in &path_comps[common..] {
        rel.push(comp.as_os_str());
    }
    rel
}

/// Resolve a stored relative path against `base`.
///
/// Both `/` and `\` are accepted as separators in `stored`.
pub fn resolve(base: &Path, stored: &str) -> PathBuf {
    let candidate = Path::new(stored);
    if candidate.is_absolute() {
        return normalize(candidate);
    }
    let mut out = base.to_path_buf();
    for part in split_separators(stored) {
        out.push(part);
    }
    normalize(&out)
}

/// Split on either separator style, skipping empty segments.
pub fn split_separators(s: &str) -> impl Iterator<Item = &str> {
    s.split(['/', '\\']).filter(|part| !part.is_empty())
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Case-insensitive path equality after normalization, separator-agnostic.
pub fn eq_ignore_case(a: &Path, b: &Path) -> bool {
    comparable(a) == comparable(b)
}

fn comparable(path: &Path) -> String {
    normalize(path)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
