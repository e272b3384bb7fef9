/*!
Local filesystem handler.
*/

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::Handler;
use crate::resource::{Payload, Resource};
use crate::{Result, UssrError};

/// Stores resources as files at `{location}/{name}.{extension}`
///
/// Missing parent directories are created on save. When a base directory is
/// set, relative resource locations are resolved against it.
///
/// # Example
/// ```rust
/// use ussr_core::handler::{local::FileSystemHandler, Handler};
/// use ussr_core::{LocationKind, Resource};
///
/// let dir = tempfile::tempdir()?;
/// let handler = FileSystemHandler::with_base_dir(dir.path());
/// let resource = Resource::new("notes", "run_1", LocationKind::Filesystem)
///     .with_content_type("txt")
///     .with_payload("hello");
///
/// handler.save(&resource)?;
/// assert!(dir.path().join("run_1/notes.txt").exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSystemHandler {
    base_dir: Option<PathBuf>,
}

impl FileSystemHandler {
    /// Create a handler that uses resource locations as-is
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a handler that resolves relative locations under `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Full path the resource is stored at
    pub fn resolve_path(&self, resource: &Resource) -> PathBuf {
        let path = resource.path();
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    fn ensure_parent_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    error!(path = %parent.display(), error = %e, "Failed to create directory");
                    UssrError::Io(e)
                })?;
            }
        }
        Ok(())
    }
}

impl Handler for FileSystemHandler {
    fn save(&self, resource: &Resource) -> Result<()> {
        let data = resource.payload.as_bytes().ok_or_else(|| {
            UssrError::validation(format!("Resource '{}' has no payload to save", resource.name))
        })?;
        let path = self.resolve_path(resource);

        Self::ensure_parent_dir(&path)?;
        fs::write(&path, data).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to save resource");
            UssrError::Io(e)
        })?;

        info!(path = %path.display(), bytes = data.len(), "Saved resource");
        Ok(())
    }

    fn load(&self, resource: &Resource) -> Result<Payload> {
        let path = self.resolve_path(resource);

        let data = fs::read(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to load resource");
            UssrError::Io(e)
        })?;

        info!(path = %path.display(), bytes = data.len(), "Loaded resource");
        Ok(Payload::Bytes(data))
    }
}
