//! Write reconciler.
//!
//! ## `reconcile` flow
//!
//! 1. No rendered text → delete the artifact mapped to the source, if any.
//! 2. Allocate the output path (collision-aware).
//! 3. Byte-compare with the file on disk → skip if identical.
//! 4. Best-effort VCS checkout, then write `<path>.stencil.tmp` and rename
//!    it over the final path.
//! 5. Reuse the tracked artifact at that path or add a new one.
//! 6. Persist the mapping, then save the container if asked to.
//!
//! Callers hold the template's mutex for the whole flow.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use stencil_core::{paths, SourceUnit, MAPPED_SOURCE};

use crate::allocator;
use crate::error::{io_err, SyncError};
use crate::lookup;
use crate::mapping;
use crate::render::NamingPolicy;
use crate::tracker::ContainerTracker;
use crate::vcs::{self, VersionControl};

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of one lifecycle operation on a (source, artifact) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactResult {
    /// Content changed or the file did not exist.
    Written { path: PathBuf },
    /// Rendered content matches the file byte-for-byte.
    Unchanged { path: PathBuf },
    /// The artifact mapped to the source was removed.
    Deleted { path: PathBuf },
    /// The artifact file was renamed for a renamed source.
    Renamed { from: PathBuf, to: PathBuf },
    /// Only the mapping changed.
    Remapped { path: PathBuf },
    /// Nothing to do: no artifact exists or should exist.
    NoArtifact,
}

impl ArtifactResult {
    /// Artifact path after the operation, if one remains.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactResult::Written { path }
            | ArtifactResult::Unchanged { path }
            | ArtifactResult::Remapped { path } => Some(path),
            ArtifactResult::Renamed { to, .. } => Some(to),
            ArtifactResult::Deleted { .. } | ArtifactResult::NoArtifact => None,
        }
    }

    /// Whether the filesystem or the mapping was modified.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            ArtifactResult::Unchanged { .. } | ArtifactResult::NoArtifact
        )
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Whether `content` differs from what is on disk at `path`.
///
/// A missing file counts as changed.
pub fn content_changed(path: &Path, content: &str) -> Result<bool, SyncError> {
    match std::fs::read(path) {
        Ok(existing) => Ok(existing != content.as_bytes()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(true),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Write `content` to `path` through a `.stencil.tmp` sibling.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.stencil.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Borrowed view of one template's collaborators.
pub struct Reconciler<'a> {
    pub tracker: &'a dyn ContainerTracker,
    /// The template item whose children form the scope.
    pub scope: &'a Path,
    pub naming: &'a dyn NamingPolicy,
    pub vcs: &'a dyn VersionControl,
}

impl Reconciler<'_> {
    /// Bring the artifact for `source` in line with `rendered`.
    pub fn reconcile(
        &self,
        source: &SourceUnit,
        rendered: Option<&str>,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        let Some(text) = rendered else {
            return self.delete_by_source(source.path(), persist);
        };
        mapping::ensure_slot(self.tracker)?;

        let path = allocator::allocate(self.tracker, self.scope, source, self.naming)?;
        let result = if content_changed(&path, text)? {
            vcs::checkout_before_write(self.vcs, &path);
            atomic_write(&path, text)?;
            tracing::info!("wrote: {}", path.display());
            ArtifactResult::Written { path: path.clone() }
        } else {
            tracing::debug!("unchanged: {}", path.display());
            ArtifactResult::Unchanged { path: path.clone() }
        };

        let artifact = match lookup::find_by_output_path(self.tracker, self.scope, &path)? {
            Some(existing) => existing,
            None => self.tracker.add_from_file(self.scope, &path)?,
        };
        mapping::set_mapped_source(self.tracker, &artifact, source.path())?;
        self.remove_stale(source.path(), &artifact)?;

        if persist {
            self.tracker.save()?;
        }
        Ok(result)
    }

    /// Remove the artifact mapped to `source`, if there is one.
    pub fn delete_by_source(
        &self,
        source: &Path,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        let Some(artifact) = lookup::find_by_source_path(self.tracker, self.scope, source)? else {
            tracing::debug!("no artifact for {}", source.display());
            return Ok(ArtifactResult::NoArtifact);
        };
        self.tracker.remove(&artifact)?;
        tracing::info!("deleted: {}", artifact.display());
        if persist {
            self.tracker.save()?;
        }
        Ok(ArtifactResult::Deleted { path: artifact })
    }

    /// Follow a source rename from `old_source` to `new_source`.
    ///
    /// With an identical file name only the mapping moves; otherwise the
    /// artifact is renamed to the name allocated for the new source.
    pub fn rename(
        &self,
        new_source: &SourceUnit,
        old_source: &Path,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        mapping::ensure_slot(self.tracker)?;
        let Some(artifact) = lookup::find_by_source_path(self.tracker, self.scope, old_source)?
        else {
            tracing::debug!("no artifact for renamed {}", old_source.display());
            return Ok(ArtifactResult::NoArtifact);
        };
        let previous = self.tracker.attribute(&artifact, MAPPED_SOURCE)?;
        mapping::set_mapped_source(self.tracker, &artifact, new_source.path())?;

        let result = if old_source.file_name() == new_source.path().file_name() {
            tracing::info!("remapped: {} -> {}", artifact.display(), new_source);
            ArtifactResult::Remapped { path: artifact }
        } else {
            match self.move_artifact(new_source, artifact.clone()) {
                Ok(result) => result,
                Err(err) => {
                    let previous = previous.unwrap_or_default();
                    if let Err(restore) =
                        self.tracker
                            .set_attribute(&artifact, MAPPED_SOURCE, &previous)
                    {
                        tracing::warn!(
                            "could not restore mapping of {}: {restore}",
                            artifact.display()
                        );
                    }
                    return Err(err);
                }
            }
        };

        if persist {
            self.tracker.save()?;
        }
        Ok(result)
    }

    fn move_artifact(
        &self,
        new_source: &SourceUnit,
        artifact: PathBuf,
    ) -> Result<ArtifactResult, SyncError> {
        let target = allocator::allocate(self.tracker, self.scope, new_source, self.naming)?;
        if target == artifact {
            return Ok(ArtifactResult::Remapped { path: artifact });
        }
        // The allocator may hand out a path held by an unmapped artifact.
        if let Some(occupant) = lookup::find_by_output_path(self.tracker, self.scope, &target)? {
            if occupant != artifact {
                self.tracker.remove(&occupant)?;
                tracing::info!("deleted unmapped occupant: {}", occupant.display());
            }
        }
        let Some(name) = target.file_name().and_then(|n| n.to_str()) else {
            return Err(SyncError::Integrity(format!(
                "allocated path {} has no file name",
                target.display()
            )));
        };
        let to = self.tracker.rename(&artifact, name)?;
        tracing::info!("renamed: {} -> {}", artifact.display(), to.display());
        Ok(ArtifactResult::Renamed { from: artifact, to })
    }

    /// Drop other artifacts still mapped to `source` after it moved to `keep`.
    fn remove_stale(&self, source: &Path, keep: &Path) -> Result<(), SyncError> {
        for child in self.tracker.children(self.scope)? {
            if paths::eq_ignore_case(&child, keep) {
                continue;
            }
            match mapping::mapped_source(self.tracker, &child) {
                Ok(Some(mapped)) if paths::eq_ignore_case(&mapped, source) => {
                    self.tracker.remove(&child)?;
                    tracing::info!("deleted stale: {}", child.display());
                }
                Ok(_) => {}
                Err(err) => tracing::debug!("skipping {}: {err}", child.display()),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
