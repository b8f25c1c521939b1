//! Project manifest: the container that tracks templates and their artifacts.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   stencil.yaml        (manifest: templates, artifacts, attributes)
//!   templates/
//!     models.tera       (template item)
//!     Customer.ts       (artifact item, child of models.tera)
//! ```
//!
//! # API pattern
//!
//! A [`Project`] is located by an explicit root (`*_at` constructors) and is
//! shared between threads: the manifest sits behind an `RwLock`, so every
//! method takes `&self`. Mutations stay in memory until [`Project::save`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::error::{io_err, ProjectError};
use crate::paths::{normalize, resolve, to_slash};
use crate::types::{
    ItemKind, Manifest, TemplateSettings, TrackedItem, VcsSettings, MANIFEST_FILE,
};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/stencil.yaml`. Pure, no I/O.
pub fn manifest_path_at(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

/// Walk up from `start` to the nearest directory containing a manifest.
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| manifest_path_at(dir).is_file())
        .map(Path::to_path_buf)
}

// ---------------------------------------------------------------------------
// 2. Project
// ---------------------------------------------------------------------------

/// A loaded project manifest rooted at a directory.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    manifest: RwLock<Manifest>,
}

impl Project {
    /// Load the manifest at `<root>/stencil.yaml`.
    ///
    /// Returns `ProjectError::ManifestNotFound` if absent,
    /// `ProjectError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(root: &Path) -> Result<Self, ProjectError> {
        let path = manifest_path_at(root);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ProjectError::ManifestNotFound { path });
            }
            Err(err) => return Err(io_err(&path, err)),
        };
        let manifest: Manifest = serde_yaml::from_str(&contents)
            .map_err(|source| ProjectError::Parse { path, source })?;
        Ok(Self::from_manifest(root, manifest))
    }

    /// Create `<root>/stencil.yaml` with an empty manifest.
    ///
    /// Idempotent: if a manifest already exists, loads and returns it unchanged.
    pub fn init_at(root: &Path) -> Result<Self, ProjectError> {
        if manifest_path_at(root).exists() {
            return Self::load_at(root);
        }
        fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
        let project = Self::from_manifest(root, Manifest::new());
        project.save()?;
        Ok(project)
    }

    /// Wrap an in-memory manifest without touching the filesystem.
    pub fn from_manifest(root: &Path, manifest: Manifest) -> Self {
        Self {
            root: normalize(root),
            manifest: RwLock::new(manifest),
        }
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of the current manifest.
    pub fn manifest(&self) -> Manifest {
        self.read().clone()
    }

    /// Version-control commands configured for the project, if any.
    pub fn vcs(&self) -> Option<VcsSettings> {
        self.read().vcs.clone()
    }

    /// Atomically write the manifest to `<root>/stencil.yaml`.
    ///
    /// Write flow: serialize → `.yaml.tmp` sibling → `rename`. The write lock
    /// is held throughout so concurrent saves never interleave.
    pub fn save(&self) -> Result<(), ProjectError> {
        let mut manifest = self.write();
        manifest.updated_at = Utc::now();

        let path = manifest_path_at(&self.root);
        let tmp = path.with_file_name(format!("{MANIFEST_FILE}.tmp"));
        let yaml = serde_yaml::to_string(&*manifest)?;
        fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&path, err));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    /// Track `template` (absolute or root-relative) with the given settings.
    ///
    /// Re-adding an existing template replaces its settings and keeps its
    /// artifacts.
    pub fn add_template(
        &self,
        template: &Path,
        settings: TemplateSettings,
    ) -> Result<PathBuf, ProjectError> {
        let key = self.key_for(template)?;
        let mut manifest = self.write();
        match manifest.items.iter_mut().find(|item| item.path == key) {
            Some(item) if item.kind == ItemKind::Template => item.settings = Some(settings),
            Some(_) => return Err(ProjectError::NotATemplate { path: self.abs(&key) }),
            None => manifest.items.push(TrackedItem::template(key.clone(), settings)),
        }
        Ok(self.abs(&key))
    }

    /// Stop tracking a template and its artifacts. Files stay on disk.
    pub fn remove_template(&self, template: &Path) -> Result<(), ProjectError> {
        let key = self.key_for(template)?;
        let mut manifest = self.write();
        let before = manifest.items.len();
        manifest
            .items
            .retain(|item| !(item.path == key && item.kind == ItemKind::Template));
        if manifest.items.len() == before {
            return Err(ProjectError::ItemNotFound { path: self.abs(&key) });
        }
        Ok(())
    }

    /// Absolute paths of all tracked templates, in manifest order.
    pub fn templates(&self) -> Vec<PathBuf> {
        self.read()
            .items
            .iter()
            .filter(|item| item.kind == ItemKind::Template)
            .map(|item| self.abs(&item.path))
            .collect()
    }

    /// Settings of a tracked template.
    pub fn template_settings(&self, template: &Path) -> Result<TemplateSettings, ProjectError> {
        let key = self.key_for(template)?;
        let manifest = self.read();
        let item = find_template(&manifest, &key).ok_or_else(|| ProjectError::ItemNotFound {
            path: self.abs(&key),
        })?;
        Ok(item.settings.clone().unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Artifacts (children of a template)
    // -----------------------------------------------------------------------

    /// Absolute paths of the direct children of `scope`.
    pub fn children(&self, scope: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        let key = self.key_for(scope)?;
        let manifest = self.read();
        let item = find_template(&manifest, &key).ok_or_else(|| ProjectError::ItemNotFound {
            path: self.abs(&key),
        })?;
        Ok(item.children.iter().map(|c| self.abs(&c.path)).collect())
    }

    /// Track an existing file as an artifact under `scope`.
    ///
    /// Adding a file that is already a child is a no-op. A file tracked by
    /// another template is rejected with `OwnedElsewhere`.
    pub fn add_child(&self, scope: &Path, file: &Path) -> Result<PathBuf, ProjectError> {
        let scope_key = self.key_for(scope)?;
        let file_key = self.key_for(file)?;
        let abs = self.abs(&file_key);
        fs::metadata(&abs).map_err(|e| io_err(&abs, e))?;

        let mut manifest = self.write();
        let owner = find_owner(&manifest, &file_key)
            .filter(|owner| owner.path != scope_key)
            .map(|owner| self.abs(&owner.path));
        if let Some(owner) = owner {
            return Err(ProjectError::OwnedElsewhere { path: abs, owner });
        }
        let template = find_template_mut(&mut manifest, &scope_key).ok_or_else(|| {
            ProjectError::ItemNotFound {
                path: self.abs(&scope_key),
            }
        })?;
        if !template.children.iter().any(|c| c.path == file_key) {
            template
                .children
                .push(TrackedItem::new(file_key, ItemKind::Artifact));
        }
        Ok(abs)
    }

    /// Untrack an artifact and delete its file.
    pub fn remove_child(&self, item: &Path) -> Result<(), ProjectError> {
        let key = self.key_for(item)?;
        let mut manifest = self.write();
        let removed = manifest.items.iter_mut().any(|template| {
            let before = template.children.len();
            template.children.retain(|c| c.path != key);
            template.children.len() != before
        });
        if !removed {
            return Err(ProjectError::ItemNotFound { path: self.abs(&key) });
        }
        let abs = self.abs(&key);
        match fs::remove_file(&abs) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&abs, err)),
        }
    }

    /// Rename an artifact's file within its directory and update its entry.
    ///
    /// Fails with `OwnedElsewhere` when the new name is already tracked.
    /// Returns the new absolute path.
    pub fn rename_child(&self, item: &Path, new_name: &str) -> Result<PathBuf, ProjectError> {
        let key = self.key_for(item)?;
        let from = self.abs(&key);
        let to = from.with_file_name(new_name);
        let new_key = self.key_for(&to)?;

        let mut manifest = self.write();
        if !same_key(&key, &new_key) {
            if let Some(owner) = find_owner(&manifest, &new_key) {
                return Err(ProjectError::OwnedElsewhere {
                    path: to,
                    owner: self.abs(&owner.path),
                });
            }
        }
        let entry = find_child_mut(&mut manifest, &key)
            .ok_or_else(|| ProjectError::ItemNotFound { path: from.clone() })?;
        if from.exists() {
            fs::rename(&from, &to).map_err(|e| io_err(&to, e))?;
        }
        entry.path = new_key;
        Ok(to)
    }

    /// Template whose scope tracks `file`, if any. Case-insensitive.
    pub fn owner_of(&self, file: &Path) -> Result<Option<PathBuf>, ProjectError> {
        let key = self.key_for(file)?;
        let manifest = self.read();
        Ok(find_owner(&manifest, &key).map(|owner| self.abs(&owner.path)))
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Read a named attribute of an artifact.
    pub fn attribute(&self, item: &Path, name: &str) -> Result<Option<String>, ProjectError> {
        let key = self.key_for(item)?;
        let manifest = self.read();
        let entry = find_child(&manifest, &key).ok_or_else(|| ProjectError::ItemNotFound {
            path: self.abs(&key),
        })?;
        Ok(entry.attributes.get(name).cloned())
    }

    /// Write a named attribute of an artifact.
    ///
    /// Fails with `MissingAttributeSlot` when the project does not declare
    /// `name` in its `attributes` list.
    pub fn set_attribute(&self, item: &Path, name: &str, value: &str) -> Result<(), ProjectError> {
        let key = self.key_for(item)?;
        let mut manifest = self.write();
        if !manifest.attributes.contains(name) {
            return Err(ProjectError::MissingAttributeSlot {
                item: self.abs(&key),
                name: name.to_string(),
            });
        }
        let entry = find_child_mut(&mut manifest, &key).ok_or_else(|| {
            ProjectError::ItemNotFound {
                path: self.abs(&key),
            }
        })?;
        entry.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn key_for(&self, path: &Path) -> Result<String, ProjectError> {
        let abs = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        };
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| ProjectError::OutsideRoot {
                path: abs.clone(),
                root: self.root.clone(),
            })?;
        Ok(to_slash(rel))
    }

    fn abs(&self, key: &str) -> PathBuf {
        resolve(&self.root, key)
    }

    fn read(&self) -> RwLockReadGuard<'_, Manifest> {
        self.manifest.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Manifest> {
        self.manifest.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn find_template<'a>(manifest: &'a Manifest, key: &str) -> Option<&'a TrackedItem> {
    manifest
        .items
        .iter()
        .find(|item| item.kind == ItemKind::Template && item.path == key)
}

fn find_template_mut<'a>(manifest: &'a mut Manifest, key: &str) -> Option<&'a mut TrackedItem> {
    manifest
        .items
        .iter_mut()
        .find(|item| item.kind == ItemKind::Template && item.path == key)
}

fn same_key(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn find_owner<'a>(manifest: &'a Manifest, key: &str) -> Option<&'a TrackedItem> {
    manifest.items.iter().find(|item| {
        item.kind == ItemKind::Template && item.children.iter().any(|c| same_key(&c.path, key))
    })
}

fn find_child<'a>(manifest: &'a Manifest, key: &str) -> Option<&'a TrackedItem> {
    manifest
        .items
        .iter()
        .flat_map(|item| item.children.iter())
        .find(|child| child.path == key)
}

fn find_child_mut<'a>(manifest: &'a mut Manifest, key: &str) -> Option<&'a mut TrackedItem> {
    manifest
        .items
        .iter_mut()
        .flat_map(|item| item.children.iter_mut())
        .find(|child| child.path == key)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
