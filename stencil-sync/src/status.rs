//! Artifact status classification.
//!
//! Precedence per artifact:
//! 1. `Missing` (tracked but absent on disk)
//! 2. `Unmapped` (no `mapped_source`)
//! 3. `Orphaned` (mapped source deleted or no longer in the template's sources)
//! 4. `Current`

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SyncError;
use crate::mapping;
use crate::render::SourceCatalog;
use crate::tracker::ContainerTracker;

/// Classification of one tracked artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Current,
    Orphaned {
        #[serde(skip)]
        source: PathBuf,
    },
    Unmapped,
    Missing,
}

impl ArtifactStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactStatus::Current => "current",
            ArtifactStatus::Orphaned { .. } => "orphaned",
            ArtifactStatus::Unmapped => "unmapped",
            ArtifactStatus::Missing => "missing",
        }
    }
}

/// Status of one artifact together with its mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub artifact: PathBuf,
    pub source: Option<PathBuf>,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

/// Classify every artifact in `scope`. Unreadable entries are skipped.
pub fn check(
    tracker: &dyn ContainerTracker,
    scope: &Path,
    sources: &dyn SourceCatalog,
) -> Result<Vec<ArtifactReport>, SyncError> {
    let mut reports = Vec::new();
    for artifact in tracker.children(scope)? {
        let source = match mapping::mapped_source(tracker, &artifact) {
            Ok(source) => source,
            Err(err) => {
                tracing::debug!("skipping {}: {err}", artifact.display());
                continue;
            }
        };
        let status = match &source {
            _ if !artifact.exists() => ArtifactStatus::Missing,
            None => ArtifactStatus::Unmapped,
            Some(src) if !src.is_file() || !sources.contains(src) => ArtifactStatus::Orphaned {
                source: src.clone(),
            },
            Some(_) => ArtifactStatus::Current,
        };
        reports.push(ArtifactReport {
            artifact,
            source,
            status,
        });
    }
    Ok(reports)
}
