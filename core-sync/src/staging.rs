//! # Staging Manager
//!
//! Local working sets for downloaded files. The normal and large areas are
//! independent directories with independent cleanup switches.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::{FileSystemAccess, RemoteFile};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::routing::StagingTarget;

/// A file materialized in a staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Remote record the file was downloaded from, when known in this run.
    pub record: Option<RemoteFile>,
}

impl StagedFile {
    pub fn new(path: PathBuf, record: Option<RemoteFile>) -> Self {
        Self { path, record }
    }

    /// Local file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name used for classification and upload: the remote name when known.
    pub fn display_name(&self) -> String {
        match &self.record {
            Some(record) => record.name.clone(),
            None => self.file_name(),
        }
    }

    /// Declared MIME type of the record, else a guess from the extension.
    pub fn mime_type(&self) -> Option<String> {
        if let Some(declared) = self
            .record
            .as_ref()
            .and_then(|r| r.mime_type.as_deref())
            .filter(|m| !m.is_empty())
        {
            return Some(declared.to_string());
        }

        mime_guess::from_path(&self.path)
            .first()
            .map(|mime| mime.essence_str().to_string())
    }
}

/// Result of the post-upload cleanup of one area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The pass never reached cleanup for this area
    #[default]
    NotRun,
    /// Sweeping is switched off for this area
    Disabled,
    Swept { removed: usize },
    /// Some entries could not be deleted; they are left in place
    Partial { removed: usize, failed: Vec<String> },
    /// The area could not be listed; nothing was deleted
    Failed(String),
}

/// One staging directory.
#[derive(Clone)]
pub struct StagingArea {
    target: StagingTarget,
    root: PathBuf,
    fs: Arc<dyn FileSystemAccess>,
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("target", &self.target)
            .field("root", &self.root)
            .finish()
    }
}

impl StagingArea {
    pub fn target(&self) -> StagingTarget {
        self.target
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a remote name. Separators are replaced so the result
    /// always stays directly inside the area.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut cleaned: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                other => other,
            })
            .collect();

        if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
            cleaned.insert(0, '_');
        }

        self.root.join(cleaned)
    }

    /// Write a downloaded payload under the record's name.
    pub async fn write(&self, record: &RemoteFile, data: Bytes) -> Result<StagedFile> {
        let path = self.path_for(&record.name);
        self.fs
            .write_file(&path, data)
            .await
            .map_err(|source| staging_error(&path, source))?;

        debug!(area = %self.target, file = %strip_path(&path.to_string_lossy()), "Staged file");
        Ok(StagedFile::new(path, Some(record.clone())))
    }

    /// Files directly inside the area, sorted by name. Subdirectories are
    /// ignored.
    pub async fn list(&self) -> Result<Vec<StagedFile>> {
        let entries = self
            .fs
            .list_directory(&self.root)
            .await
            .map_err(|source| staging_error(&self.root, source))?;

        let mut files = Vec::with_capacity(entries.len());
        for path in entries {
            let metadata = self
                .fs
                .metadata(&path)
                .await
                .map_err(|source| staging_error(&path, source))?;
            if !metadata.is_directory {
                files.push(StagedFile::new(path, None));
            }
        }

        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(files)
    }

    pub async fn read(&self, file: &StagedFile) -> Result<Bytes> {
        self.fs
            .read_file(&file.path)
            .await
            .map_err(|source| staging_error(&file.path, source))
    }

    /// Delete everything inside the area. The directory itself is kept.
    ///
    /// Best effort: an entry that cannot be deleted is logged and skipped,
    /// and the sweep moves on to the next one.
    pub async fn sweep(&self) -> CleanupOutcome {
        let entries = match self.fs.list_directory(&self.root).await {
            Ok(entries) => entries,
            Err(e) => return CleanupOutcome::Failed(staging_error(&self.root, e).to_string()),
        };

        let mut removed = 0;
        let mut failed = Vec::new();
        for path in entries {
            match self.remove_entry(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    let name = strip_path(&path.to_string_lossy()).to_string();
                    warn!(area = %self.target, file = %name, error = %e, "Could not delete staged entry");
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            CleanupOutcome::Swept { removed }
        } else {
            CleanupOutcome::Partial { removed, failed }
        }
    }

    async fn remove_entry(&self, path: &Path) -> Result<()> {
        let metadata = self
            .fs
            .metadata(path)
            .await
            .map_err(|source| staging_error(path, source))?;

        let result = if metadata.is_directory {
            self.fs.delete_dir_all(path).await
        } else {
            self.fs.delete_file(path).await
        };
        result.map_err(|source| staging_error(path, source))
    }
}

fn staging_error(path: &Path, source: BridgeError) -> SyncError {
    SyncError::Staging {
        path: path.display().to_string(),
        source,
    }
}

/// Owns the two staging directories.
pub struct StagingManager {
    fs: Arc<dyn FileSystemAccess>,
    normal_dir: PathBuf,
    large_dir: PathBuf,
}

impl StagingManager {
    pub fn new(fs: Arc<dyn FileSystemAccess>, normal_dir: PathBuf, large_dir: PathBuf) -> Self {
        Self {
            fs,
            normal_dir,
            large_dir,
        }
    }

    fn area(&self, target: StagingTarget) -> StagingArea {
        let root = match target {
            StagingTarget::Normal => self.normal_dir.clone(),
            StagingTarget::Large => self.large_dir.clone(),
        };
        StagingArea {
            target,
            root,
            fs: Arc::clone(&self.fs),
        }
    }

    /// Create the area's directory if missing.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or the path is a file.
    pub async fn ensure(&self, target: StagingTarget) -> Result<StagingArea> {
        let area = self.area(target);

        self.fs
            .create_dir_all(&area.root)
            .await
            .map_err(|source| staging_error(&area.root, source))?;

        let metadata = self
            .fs
            .metadata(&area.root)
            .await
            .map_err(|source| staging_error(&area.root, source))?;
        if !metadata.is_directory {
            return Err(staging_error(
                &area.root,
                BridgeError::OperationFailed("staging path is not a directory".to_string()),
            ));
        }

        debug!(area = %target, path = %area.root.display(), "Staging area ready");
        Ok(area)
    }

    /// The area when its directory already exists, without creating it.
    pub async fn existing(&self, target: StagingTarget) -> Result<Option<StagingArea>> {
        let area = self.area(target);
        let exists = self
            .fs
            .exists(&area.root)
            .await
            .map_err(|source| staging_error(&area.root, source))?;

        Ok(exists.then_some(area))
    }

    /// Sweep `area` when `enabled`. Failures are logged, never returned.
    pub async fn sweep_if(&self, area: &StagingArea, enabled: bool) -> CleanupOutcome {
        if !enabled {
            info!(area = %area.target, "Cleanup disabled, keeping staged files");
            return CleanupOutcome::Disabled;
        }

        let outcome = area.sweep().await;
        match &outcome {
            CleanupOutcome::Swept { removed } => {
                info!(area = %area.target, removed, "Staging area swept");
            }
            CleanupOutcome::Partial { removed, failed } => {
                warn!(area = %area.target, removed, left = failed.len(), "Staging area partly swept");
            }
            CleanupOutcome::Failed(reason) => {
                warn!(area = %area.target, error = %reason, "Cleanup failed");
            }
            CleanupOutcome::NotRun | CleanupOutcome::Disabled => {}
        }
        outcome
    }
}
