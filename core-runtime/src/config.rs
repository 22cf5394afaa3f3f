//! # Sorter Configuration
//!
//! Process-wide settings for a sync run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`SorterConfig`]. `build()` fails fast with an actionable message when a
//! required setting is missing or the combination is inconsistent, so a run
//! never starts with half-valid settings.
//!
//! ## Required Settings
//!
//! - `destination_folder_id` - remote folder the category folders live under
//! - `source_folder_id` - remote folder the media is pulled from; only a sync
//!   pass lists it, see [`SorterConfig::require_source`]
//!
//! ## Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | normal staging dir | `./downloaded_files` |
//! | large staging dir | `./large_files` |
//! | size threshold | 1 GiB |
//! | group photo threshold | 15 faces |
//! | sweep normal / large after upload | `true` / `true` |
//! | stage large files during sync | `true` |
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::SorterConfig;
//!
//! let config = SorterConfig::builder()
//!     .source_folder_id("1AbCdEf")
//!     .destination_folder_id("9ZyXwVu")
//!     .size_threshold_bytes(512 * 1024 * 1024)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.thresholds.group_photo_threshold, 15);
//! ```

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::PathBuf;

/// Files strictly larger than this go to the large staging area.
pub const DEFAULT_SIZE_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;

/// An image with strictly more faces than this is a group photo.
pub const DEFAULT_GROUP_PHOTO_THRESHOLD: usize = 15;

pub const DEFAULT_NORMAL_STAGING_DIR: &str = "./downloaded_files";
pub const DEFAULT_LARGE_STAGING_DIR: &str = "./large_files";

/// Size and face-count cutoffs. Constant for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub size_threshold_bytes: u64,
    pub group_photo_threshold: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD_BYTES,
            group_photo_threshold: DEFAULT_GROUP_PHOTO_THRESHOLD,
        }
    }
}

/// Independent switches for sweeping each staging area after its upload pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    pub sweep_normal: bool,
    pub sweep_large: bool,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            sweep_normal: true,
            sweep_large: true,
        }
    }
}

/// Literal names of the destination folders, one per uploadable category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNames {
    pub images: String,
    pub videos: String,
    pub dslr_images: String,
    pub group_photos: String,
    pub geotagged_images: String,
}

impl FolderNames {
    /// All names in provisioning order.
    pub fn all(&self) -> [&str; 5] {
        [
            self.images.as_str(),
            self.videos.as_str(),
            self.dslr_images.as_str(),
            self.group_photos.as_str(),
            self.geotagged_images.as_str(),
        ]
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.all() {
            if name.trim().is_empty() {
                return Err(Error::Config(
                    "Destination folder names cannot be empty".to_string(),
                ));
            }
            if name.contains('/') {
                return Err(Error::Config(format!(
                    "Destination folder name '{}' cannot contain '/'",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(Error::Config(format!(
                    "Destination folder name '{}' is used for more than one category",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            images: "images".to_string(),
            videos: "videos".to_string(),
            dslr_images: "DSLRImages".to_string(),
            group_photos: "GroupPhotos".to_string(),
            geotagged_images: "GeotaggedImages".to_string(),
        }
    }
}

/// Immutable configuration for one run.
///
/// Use [`SorterConfig::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorterConfig {
    /// Remote folder listed for images and videos. The upload-large pass
    /// never lists it.
    pub source_folder_id: Option<String>,

    /// Remote folder the category folders are created under
    pub destination_folder_id: String,

    /// Local staging directory for files at or below the size threshold
    pub normal_staging_dir: PathBuf,

    /// Local staging directory for files above the size threshold
    pub large_staging_dir: PathBuf,

    pub thresholds: ThresholdConfig,

    pub cleanup: CleanupPolicy,

    pub folder_names: FolderNames,

    /// Download large files into the large staging area during a sync pass.
    /// When disabled they are listed and counted but left on the remote.
    pub stage_large_files: bool,
}

impl SorterConfig {
    /// Creates a new builder for constructing a `SorterConfig`.
    pub fn builder() -> SorterConfigBuilder {
        SorterConfigBuilder::default()
    }

    /// The source folder id, for passes that list the source.
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` when no source folder was configured.
    pub fn require_source(&self) -> Result<&str> {
        self.source_folder_id
            .as_deref()
            .ok_or_else(|| Error::MissingSetting {
                setting: "source_folder_id".to_string(),
                message: "Set the id of the remote folder to pull images and videos from \
                          (the last path segment of the folder URL)."
                    .to_string(),
            })
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Folder ids, when set, are not blank
    /// - Staging directories are set and distinct
    /// - The size threshold is greater than zero
    /// - Destination folder names are non-empty and unique
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.source_folder_id, Some(id) if id.trim().is_empty()) {
            return Err(Error::Config("Source folder id cannot be empty".to_string()));
        }

        if self.destination_folder_id.trim().is_empty() {
            return Err(Error::Config(
                "Destination folder id cannot be empty".to_string(),
            ));
        }

        if self.normal_staging_dir.as_os_str().is_empty()
            || self.large_staging_dir.as_os_str().is_empty()
        {
            return Err(Error::Config(
                "Staging directories cannot be empty".to_string(),
            ));
        }

        if self.normal_staging_dir == self.large_staging_dir {
            return Err(Error::Config(
                "Normal and large staging directories must differ; \
                 their cleanup lifecycles are independent"
                    .to_string(),
            ));
        }

        if self.thresholds.size_threshold_bytes == 0 {
            return Err(Error::Config(
                "Size threshold must be greater than 0 bytes".to_string(),
            ));
        }

        self.folder_names.validate()
    }
}

/// Builder for constructing [`SorterConfig`] instances.
#[derive(Debug, Default)]
pub struct SorterConfigBuilder {
    source_folder_id: Option<String>,
    destination_folder_id: Option<String>,
    normal_staging_dir: Option<PathBuf>,
    large_staging_dir: Option<PathBuf>,
    size_threshold_bytes: Option<u64>,
    group_photo_threshold: Option<usize>,
    cleanup: Option<CleanupPolicy>,
    folder_names: Option<FolderNames>,
    stage_large_files: Option<bool>,
}

impl SorterConfigBuilder {
    /// Sets the remote folder to pull media from (required for a sync pass).
    pub fn source_folder_id(mut self, id: impl Into<String>) -> Self {
        self.source_folder_id = Some(id.into());
        self
    }

    /// Sets the remote folder the category folders are created under (required).
    pub fn destination_folder_id(mut self, id: impl Into<String>) -> Self {
        self.destination_folder_id = Some(id.into());
        self
    }

    /// Sets the normal staging directory.
    ///
    /// Default: `./downloaded_files`
    pub fn normal_staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.normal_staging_dir = Some(path.into());
        self
    }

    /// Sets the large-file staging directory.
    ///
    /// Default: `./large_files`
    pub fn large_staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.large_staging_dir = Some(path.into());
        self
    }

    /// Sets the size cutoff in bytes.
    ///
    /// Default: 1 GiB
    pub fn size_threshold_bytes(mut self, bytes: u64) -> Self {
        self.size_threshold_bytes = Some(bytes);
        self
    }

    /// Sets the face-count cutoff for group photos.
    ///
    /// Default: 15
    pub fn group_photo_threshold(mut self, faces: usize) -> Self {
        self.group_photo_threshold = Some(faces);
        self
    }

    pub fn sweep_normal_after_upload(mut self, enabled: bool) -> Self {
        self.cleanup.get_or_insert_with(CleanupPolicy::default).sweep_normal = enabled;
        self
    }

    pub fn sweep_large_after_upload(mut self, enabled: bool) -> Self {
        self.cleanup.get_or_insert_with(CleanupPolicy::default).sweep_large = enabled;
        self
    }

    /// Overrides the destination folder names.
    pub fn folder_names(mut self, names: FolderNames) -> Self {
        self.folder_names = Some(names);
        self
    }

    pub fn stage_large_files(mut self, enabled: bool) -> Self {
        self.stage_large_files = Some(enabled);
        self
    }

    /// Builds the final [`SorterConfig`], validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination folder id is missing or any check
    /// in [`SorterConfig::validate`] fails.
    pub fn build(self) -> Result<SorterConfig> {
        let destination_folder_id =
            self.destination_folder_id
                .ok_or_else(|| Error::MissingSetting {
                    setting: "destination_folder_id".to_string(),
                    message: "Set the id of the remote folder that receives the \
                              category folders."
                        .to_string(),
                })?;

        let defaults = ThresholdConfig::default();

        let config = SorterConfig {
            source_folder_id: self.source_folder_id,
            destination_folder_id,
            normal_staging_dir: self
                .normal_staging_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NORMAL_STAGING_DIR)),
            large_staging_dir: self
                .large_staging_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LARGE_STAGING_DIR)),
            thresholds: ThresholdConfig {
                size_threshold_bytes: self
                    .size_threshold_bytes
                    .unwrap_or(defaults.size_threshold_bytes),
                group_photo_threshold: self
                    .group_photo_threshold
                    .unwrap_or(defaults.group_photo_threshold),
            },
            cleanup: self.cleanup.unwrap_or_default(),
            folder_names: self.folder_names.unwrap_or_default(),
            stage_large_files: self.stage_large_files.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SorterConfigBuilder {
        SorterConfig::builder()
            .source_folder_id("src")
            .destination_folder_id("dst")
    }

    #[test]
    fn test_builder_applies_defaults() {
        let config = minimal().build().unwrap();

        assert_eq!(config.normal_staging_dir, PathBuf::from("./downloaded_files"));
        assert_eq!(config.large_staging_dir, PathBuf::from("./large_files"));
        assert_eq!(config.thresholds.size_threshold_bytes, 1 << 30);
        assert_eq!(config.thresholds.group_photo_threshold, 15);
        assert_eq!(config.cleanup, CleanupPolicy::default());
        assert_eq!(config.folder_names.images, "images");
        assert_eq!(config.folder_names.group_photos, "GroupPhotos");
        assert!(config.stage_large_files);
    }

    #[test]
    fn test_source_folder_required_only_for_listing() {
        let config = SorterConfig::builder()
            .destination_folder_id("dst")
            .build()
            .unwrap();

        assert_eq!(config.source_folder_id, None);
        match config.require_source() {
            Err(Error::MissingSetting { setting, .. }) => {
                assert_eq!(setting, "source_folder_id")
            }
            other => panic!("expected missing setting, got {:?}", other),
        }

        assert_eq!(minimal().build().unwrap().require_source().unwrap(), "src");
    }

    #[test]
    fn test_builder_requires_destination_folder() {
        let result = SorterConfig::builder().source_folder_id("src").build();
        assert!(matches!(result, Err(Error::MissingSetting { .. })));
    }

    #[test]
    fn test_validate_rejects_blank_folder_id() {
        let result = SorterConfig::builder()
            .source_folder_id("   ")
            .destination_folder_id("dst")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_shared_staging_dir() {
        let result = minimal()
            .normal_staging_dir("/tmp/stage")
            .large_staging_dir("/tmp/stage")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let result = minimal().size_threshold_bytes(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_folder_names() {
        let names = FolderNames {
            dslr_images: "images".to_string(),
            ..FolderNames::default()
        };
        let result = minimal().folder_names(names).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cleanup_switches_are_independent() {
        let config = minimal().sweep_large_after_upload(false).build().unwrap();
        assert!(config.cleanup.sweep_normal);
        assert!(!config.cleanup.sweep_large);
    }

    #[test]
    fn test_builder_accepts_pathbuf_and_str() {
        let config = minimal()
            .normal_staging_dir(PathBuf::from("/data/normal"))
            .large_staging_dir("/data/large")
            .group_photo_threshold(3)
            .build()
            .unwrap();

        assert_eq!(config.normal_staging_dir, PathBuf::from("/data/normal"));
        assert_eq!(config.large_staging_dir, PathBuf::from("/data/large"));
        assert_eq!(config.thresholds.group_photo_threshold, 3);
    }
}
