//! Storage Abstractions
//!
//! Local file system access for the staging areas and the remote store
//! capability used as both source and destination of a sync pass.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts the local operations the staging areas need: existence checks,
/// directory creation, listing, whole-file reads/writes and recursive delete.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stage(fs: &dyn FileSystemAccess, dir: &Path, data: Bytes) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("img_0001.jpg"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// A file or folder as reported by a remote store listing.
///
/// Records are immutable snapshots; nothing in the core writes them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Opaque identifier, unique within the remote store
    pub id: String,
    /// Display name (not guaranteed unique)
    pub name: String,
    /// Declared MIME type, when the store reports one
    pub mime_type: Option<String>,
    /// Declared size in bytes; absent for folders and some native document kinds
    pub size: Option<u64>,
    /// Last modification as a Unix timestamp
    pub modified_at: Option<i64>,
    pub is_folder: bool,
    pub parent_ids: Vec<String>,
    pub md5_checksum: Option<String>,
}

impl RemoteFile {
    /// Minimal record with only identity, name, MIME type and size.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: Option<&str>,
        size: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            size,
            modified_at: None,
            is_folder: false,
            parent_ids: Vec::new(),
            md5_checksum: None,
        }
    }
}

/// Server-side filter applied to a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Only include files whose MIME type contains one of these prefixes.
    /// Empty means no MIME restriction.
    pub mime_prefixes: Vec<String>,
    /// Include trashed files
    pub include_trashed: bool,
}

impl ListFilter {
    /// Images and videos that are not in the trash.
    pub fn images_and_videos() -> Self {
        Self {
            mime_prefixes: vec!["image/".to_string(), "video/".to_string()],
            include_trashed: false,
        }
    }
}

/// Remote store capability: source listing, transfer and folder provisioning.
///
/// Every call may fail with a transport-level error. Callers treat such
/// errors as non-retryable; adapters may retry internally.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Confirm the session is authenticated before any transfer starts.
    async fn verify_session(&self) -> Result<()>;

    /// List one page of direct children of `folder_id`.
    ///
    /// Returns the records and the token for the next page, or `None` when
    /// the listing is exhausted.
    async fn list_children(
        &self,
        folder_id: &str,
        filter: &ListFilter,
        page_token: Option<String>,
    ) -> Result<(Vec<RemoteFile>, Option<String>)>;

    /// Download the full content of a file.
    async fn download(&self, file_id: &str) -> Result<Bytes>;

    /// Upload `data` as a new file named `name` under `parent_folder_id`.
    ///
    /// Returns the new remote identifier.
    async fn upload(
        &self,
        data: Bytes,
        parent_folder_id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> Result<String>;

    /// Return the id of the folder named `name` directly under
    /// `parent_folder_id`, creating it if it does not exist.
    async fn resolve_or_create_folder(&self, parent_folder_id: &str, name: &str)
        -> Result<String>;
}
