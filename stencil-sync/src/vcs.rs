//! Version-control collaborator.
//!
//! Checked-in files may be read-only until the VCS checks them out. Every
//! call here is best-effort: [`checkout_before_write`] logs failures and lets
//! the write proceed.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use stencil_core::VcsSettings;

use crate::error::VcsError;

/// Queries and checkout for files under version control.
pub trait VersionControl: Send + Sync {
    fn is_tracked(&self, path: &Path) -> Result<bool, VcsError>;

    fn is_checked_out(&self, path: &Path) -> Result<bool, VcsError>;

    fn check_out(&self, path: &Path) -> Result<(), VcsError>;
}

/// No version control: nothing is tracked, nothing needs checking out.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVersionControl;

impl VersionControl for NoVersionControl {
    fn is_tracked(&self, _path: &Path) -> Result<bool, VcsError> {
        Ok(false)
    }

    fn is_checked_out(&self, _path: &Path) -> Result<bool, VcsError> {
        Ok(true)
    }

    fn check_out(&self, _path: &Path) -> Result<(), VcsError> {
        Ok(())
    }
}

/// Version control driven by external commands from the manifest.
///
/// The file path is appended as the last argument. Without a `status`
/// command every existing file counts as tracked. A file is considered
/// checked out when it is writable.
#[derive(Debug, Clone)]
pub struct CommandVersionControl {
    checkout: Vec<String>,
    status: Option<Vec<String>>,
}

impl CommandVersionControl {
    pub fn new(settings: VcsSettings) -> Self {
        Self {
            checkout: settings.checkout,
            status: settings.status,
        }
    }

    fn run(&self, argv: &[String], path: &Path) -> Result<bool, VcsError> {
        let (program, args) = argv.split_first().ok_or(VcsError::EmptyCommand)?;
        let output = Command::new(program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|source| VcsError::Spawn {
                command: program.clone(),
                source,
            })?;
        if !output.status.success() {
            tracing::debug!(
                "{} {}: {}",
                argv.join(" "),
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }
}

impl VersionControl for CommandVersionControl {
    fn is_tracked(&self, path: &Path) -> Result<bool, VcsError> {
        match &self.status {
            Some(status) => self.run(status, path),
            None => Ok(path.exists()),
        }
    }

    fn is_checked_out(&self, path: &Path) -> Result<bool, VcsError> {
        let meta = std::fs::metadata(path).map_err(|source| VcsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(!meta.permissions().readonly())
    }

    fn check_out(&self, path: &Path) -> Result<(), VcsError> {
        if self.run(&self.checkout, path)? {
            Ok(())
        } else {
            Err(VcsError::Failed {
                command: self.checkout.join(" "),
                status: "non-zero exit".to_string(),
            })
        }
    }
}

/// Version control configured for a project, or [`NoVersionControl`].
pub fn from_settings(settings: Option<VcsSettings>) -> Arc<dyn VersionControl> {
    match settings {
        Some(settings) => Arc::new(CommandVersionControl::new(settings)),
        None => Arc::new(NoVersionControl),
    }
}

/// Check `path` out if it exists, is tracked, and is not yet checked out.
///
/// Never fails; problems are logged and the caller writes anyway.
pub fn checkout_before_write(vcs: &dyn VersionControl, path: &Path) {
    if !path.exists() {
        return;
    }
    let result = vcs.is_tracked(path).and_then(|tracked| {
        if tracked && !vcs.is_checked_out(path)? {
            tracing::info!("checking out {}", path.display());
            vcs.check_out(path)?;
        }
        Ok(())
    });
    if let Err(err) = result {
        tracing::warn!("version control: {}: {err}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
