//! Integration tests for the sorter pipeline
//!
//! These tests drive `SyncOrchestrator` against an in-memory remote store,
//! a real temporary staging directory and a stub face detector:
//! - End-to-end routing and classification scenarios
//! - Deferred large-file pass
//! - Idempotent destination folder provisioning
//! - Skip-and-continue for per-file failures
//! - Fatal phases (session, listing)
//! - Cleanup switches

use bridge_desktop::TokioFileSystem;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    storage::{ListFilter, RemoteFile, RemoteStore},
    vision::FaceDetector,
};
use bytes::Bytes;
use core_runtime::{FolderNames, SorterConfig};
use core_sync::{
    CleanupOutcome, DestinationFolderSet, PassKind, SyncError, SyncOrchestrator, SyncPhase,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex as AsyncMutex;

const GIB: u64 = 1024 * 1024 * 1024;

// ============================================================================
// Mock Implementations
// ============================================================================

#[derive(Debug, Clone)]
struct Uploaded {
    folder_id: String,
    name: String,
    mime_type: Option<String>,
}

#[derive(Default)]
struct DriveState {
    source: Vec<RemoteFile>,
    contents: HashMap<String, Bytes>,
    /// (parent, name) -> folder id
    folders: HashMap<(String, String), String>,
    folders_created: usize,
    uploads: Vec<Uploaded>,
    calls: usize,
    failing_downloads: HashSet<String>,
    /// (file name, folder id)
    failing_uploads: HashSet<(String, String)>,
    fail_listing: bool,
    session_revoked: bool,
}

/// In-memory remote store. Listing returns every source record, ignoring
/// the filter, in pages of `page_size`.
struct InMemoryDrive {
    state: AsyncMutex<DriveState>,
    page_size: usize,
}

impl InMemoryDrive {
    fn new(page_size: usize) -> Self {
        Self {
            state: AsyncMutex::new(DriveState::default()),
            page_size,
        }
    }

    async fn add_file(&self, id: &str, name: &str, mime: Option<&str>, size: u64, content: &str) {
        let mut state = self.state.lock().await;
        state
            .source
            .push(RemoteFile::new(id, name, mime, Some(size)));
        state
            .contents
            .insert(id.to_string(), Bytes::from(content.to_string()));
    }

    async fn add_folder(&self, parent: &str, name: &str, id: &str) {
        self.state
            .lock()
            .await
            .folders
            .insert((parent.to_string(), name.to_string()), id.to_string());
    }

    async fn uploads(&self) -> Vec<Uploaded> {
        self.state.lock().await.uploads.clone()
    }

    /// Names of files uploaded into the folder called `folder_name`.
    async fn uploaded_into(&self, folder_name: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let folder_ids: HashSet<&String> = state
            .folders
            .iter()
            .filter(|((_, name), _)| name == folder_name)
            .map(|(_, id)| id)
            .collect();
        state
            .uploads
            .iter()
            .filter(|u| folder_ids.contains(&u.folder_id))
            .map(|u| u.name.clone())
            .collect()
    }

    async fn calls(&self) -> usize {
        self.state.lock().await.calls
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryDrive {
    async fn verify_session(&self) -> BridgeResult<()> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.session_revoked {
            return Err(BridgeError::Unauthorized("token revoked".to_string()));
        }
        Ok(())
    }

    async fn list_children(
        &self,
        _folder_id: &str,
        _filter: &ListFilter,
        page_token: Option<String>,
    ) -> BridgeResult<(Vec<RemoteFile>, Option<String>)> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.fail_listing {
            return Err(BridgeError::OperationFailed("listing unavailable".to_string()));
        }

        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(state.source.len());
        let page = state.source[start..end].to_vec();
        let next = (end < state.source.len()).then(|| end.to_string());
        Ok((page, next))
    }

    async fn download(&self, file_id: &str) -> BridgeResult<Bytes> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.failing_downloads.contains(file_id) {
            return Err(BridgeError::OperationFailed("connection reset".to_string()));
        }
        state
            .contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(file_id.to_string()))
    }

    async fn upload(
        &self,
        _data: Bytes,
        parent_folder_id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> BridgeResult<String> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state
            .failing_uploads
            .contains(&(name.to_string(), parent_folder_id.to_string()))
        {
            return Err(BridgeError::OperationFailed("quota exceeded".to_string()));
        }
        state.uploads.push(Uploaded {
            folder_id: parent_folder_id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.map(str::to_string),
        });
        Ok(format!("uploaded-{}", state.uploads.len()))
    }

    async fn resolve_or_create_folder(
        &self,
        parent_folder_id: &str,
        name: &str,
    ) -> BridgeResult<String> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        let key = (parent_folder_id.to_string(), name.to_string());
        if let Some(id) = state.folders.get(&key) {
            return Ok(id.clone());
        }
        let id = format!("folder-{}", name);
        state.folders.insert(key, id.clone());
        state.folders_created += 1;
        Ok(id)
    }
}

/// Reads the face count from content of the form `faces:N`; anything else
/// is undecodable.
struct ScriptedFaces;

#[async_trait::async_trait]
impl FaceDetector for ScriptedFaces {
    async fn count_faces(&self, image: Bytes) -> BridgeResult<usize> {
        std::str::from_utf8(&image)
            .ok()
            .and_then(|s| s.strip_prefix("faces:"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| BridgeError::Undecodable("not an image".to_string()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config(dir: &TempDir) -> SorterConfig {
    config_with(dir, |builder| builder)
}

fn config_with(
    dir: &TempDir,
    customize: impl FnOnce(core_runtime::config::SorterConfigBuilder) -> core_runtime::config::SorterConfigBuilder,
) -> SorterConfig {
    let builder = SorterConfig::builder()
        .source_folder_id("src")
        .destination_folder_id("dest")
        .normal_staging_dir(dir.path().join("downloaded_files"))
        .large_staging_dir(dir.path().join("large_files"))
        .size_threshold_bytes(GIB)
        .group_photo_threshold(15);
    customize(builder).build().unwrap()
}

fn orchestrator(config: SorterConfig, drive: &Arc<InMemoryDrive>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        config,
        drive.clone(),
        Arc::new(TokioFileSystem),
        Arc::new(ScriptedFaces),
    )
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_plain_image_goes_to_images_only() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "img_0001.jpg", Some("image/jpeg"), 500, "faces:2")
        .await;

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(report.listed, 1);
    assert_eq!(report.downloaded_normal, 1);
    assert_eq!(report.uploads, 1);
    assert!(report.is_clean());
    assert_eq!(drive.uploaded_into("images").await, vec!["img_0001.jpg"]);

    let uploads = drive.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].mime_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn test_dslr_group_photo_goes_to_group_photos_not_dslr() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "DSC_0042.jpg", Some("image/jpeg"), 4096, "faces:20")
        .await;

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.uploads, 2);
    assert_eq!(drive.uploaded_into("images").await, vec!["DSC_0042.jpg"]);
    assert_eq!(drive.uploaded_into("GroupPhotos").await, vec!["DSC_0042.jpg"]);
    assert!(drive.uploaded_into("DSLRImages").await.is_empty());
}

#[tokio::test]
async fn test_dslr_with_few_faces_goes_to_dslr() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "DSC_0043.jpg", Some("image/jpeg"), 4096, "faces:15")
        .await;

    orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(drive.uploaded_into("DSLRImages").await, vec!["DSC_0043.jpg"]);
    assert!(drive.uploaded_into("GroupPhotos").await.is_empty());
}

#[tokio::test]
async fn test_large_video_is_staged_then_uploaded_by_large_pass() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "clip_GPS_001.mp4", Some("video/mp4"), 2 * GIB, "video-bytes")
        .await;
    let config = config(&dir);
    let large_dir = config.large_staging_dir.clone();
    let orchestrator = orchestrator(config, &drive);

    let report = orchestrator.run_sync().await.unwrap();
    assert_eq!(report.downloaded_large, 1);
    assert_eq!(report.downloaded_normal, 0);
    assert_eq!(report.uploads, 0);
    assert_eq!(report.large_cleanup, CleanupOutcome::NotRun);
    assert!(drive.uploads().await.is_empty());
    assert_eq!(file_names(&large_dir), vec!["clip_GPS_001.mp4"]);

    let report = orchestrator.upload_large().await.unwrap();
    assert_eq!(report.kind, PassKind::UploadLarge);
    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(report.uploads, 1);
    assert_eq!(drive.uploaded_into("videos").await, vec!["clip_GPS_001.mp4"]);
    assert!(drive.uploaded_into("GeotaggedImages").await.is_empty());

    let uploads = drive.uploads().await;
    assert_eq!(uploads[0].mime_type.as_deref(), Some("video/mp4"));
    assert_eq!(report.large_cleanup, CleanupOutcome::Swept { removed: 1 });
    assert!(file_names(&large_dir).is_empty());
}

#[tokio::test]
async fn test_file_without_mime_is_skipped() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive.add_file("1", "scan", None, 10, "faces:0").await;
    drive
        .add_file("2", "img_0002.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(report.skipped_unclassified, 1);
    assert_eq!(report.uploads, 1);
    assert!(drive.uploads().await.iter().all(|u| u.name != "scan"));
}

#[tokio::test]
async fn test_large_pass_skips_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    let config = config(&dir);
    std::fs::create_dir_all(&config.large_staging_dir).unwrap();
    std::fs::write(config.large_staging_dir.join("notes"), b"plain").unwrap();
    std::fs::write(config.large_staging_dir.join("trip_GPS.jpg"), b"faces:1").unwrap();

    let report = orchestrator(config, &drive).upload_large().await.unwrap();

    assert_eq!(report.skipped_unclassified, 1);
    assert_eq!(report.uploads, 2);
    assert_eq!(drive.uploaded_into("GeotaggedImages").await, vec!["trip_GPS.jpg"]);
}

// ============================================================================
// Provisioning
// ============================================================================

#[tokio::test]
async fn test_provisioning_is_idempotent() {
    let drive = InMemoryDrive::new(100);
    let names = FolderNames::default();

    let first = DestinationFolderSet::provision(&drive, "dest", &names)
        .await
        .unwrap();
    let second = DestinationFolderSet::provision(&drive, "dest", &names)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    assert_eq!(drive.state.lock().await.folders_created, 5);
}

#[tokio::test]
async fn test_existing_folders_are_reused() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive.add_folder("dest", "images", "pre-existing-images").await;
    drive
        .add_file("1", "img_0001.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;

    orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    let uploads = drive.uploads().await;
    assert_eq!(uploads[0].folder_id, "pre-existing-images");
    assert_eq!(drive.state.lock().await.folders_created, 4);
}

// ============================================================================
// Skip and continue
// ============================================================================

#[tokio::test]
async fn test_download_failure_skips_file() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "a.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;
    drive
        .add_file("2", "b.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;
    drive
        .state
        .lock()
        .await
        .failing_downloads
        .insert("1".to_string());

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(report.listed, 2);
    assert_eq!(report.download_failures, 1);
    assert_eq!(report.uploads, 1);
    assert_eq!(drive.uploaded_into("images").await, vec!["b.jpg"]);
}

#[tokio::test]
async fn test_upload_failure_skips_only_that_category() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "DSC_party.jpg", Some("image/jpeg"), 10, "faces:30")
        .await;
    drive
        .add_file("2", "img_0002.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;
    drive
        .state
        .lock()
        .await
        .failing_uploads
        .insert(("DSC_party.jpg".to_string(), "folder-GroupPhotos".to_string()));

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.upload_failures, 1);
    assert_eq!(report.uploads, 2);
    assert_eq!(
        drive.uploaded_into("images").await,
        vec!["DSC_party.jpg", "img_0002.jpg"]
    );
}

#[tokio::test]
async fn test_undecodable_image_still_uploaded() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "DSC_0001.jpg", Some("image/jpeg"), 10, "corrupt")
        .await;

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.uploads, 2);
    assert_eq!(drive.uploaded_into("DSLRImages").await, vec!["DSC_0001.jpg"]);
}

#[tokio::test]
async fn test_listing_is_paginated_in_full() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(2));
    for i in 0..5 {
        let name = format!("img_{}.jpg", i);
        drive
            .add_file(&i.to_string(), &name, Some("image/jpeg"), 10, "faces:0")
            .await;
    }

    let report = orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    assert_eq!(report.listed, 5);
    assert_eq!(report.uploads, 5);
    // Uploads follow staged-listing order
    assert_eq!(
        drive.uploaded_into("images").await,
        vec!["img_0.jpg", "img_1.jpg", "img_2.jpg", "img_3.jpg", "img_4.jpg"]
    );
}

// ============================================================================
// Fatal phases
// ============================================================================

#[tokio::test]
async fn test_listing_failure_aborts_in_download_phase() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive.state.lock().await.fail_listing = true;

    let result = orchestrator(config(&dir), &drive).run_sync().await;

    match result {
        Err(SyncError::PhaseFailed { phase, source }) => {
            assert_eq!(phase, SyncPhase::DownloadNormal);
            assert!(matches!(*source, SyncError::Remote(_)));
        }
        other => panic!("expected PhaseFailed, got {:?}", other),
    }
    assert!(drive.uploads().await.is_empty());
}

#[tokio::test]
async fn test_revoked_session_aborts_in_init() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "img_0001.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;
    drive.state.lock().await.session_revoked = true;

    let error = orchestrator(config(&dir), &drive)
        .run_sync()
        .await
        .unwrap_err();

    assert_eq!(error.failed_phase(), Some(SyncPhase::Init));
    assert!(error.to_string().contains("Init"));
}

#[tokio::test]
async fn test_staging_creation_failure_aborts_in_init() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    std::fs::write(dir.path().join("downloaded_files"), b"in the way").unwrap();

    let error = orchestrator(config(&dir), &drive)
        .run_sync()
        .await
        .unwrap_err();

    assert_eq!(error.failed_phase(), Some(SyncPhase::Init));
    assert_eq!(drive.calls().await, 0);
}

#[tokio::test]
async fn test_upload_large_without_area_does_not_contact_remote() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));

    let report = orchestrator(config(&dir), &drive)
        .upload_large()
        .await
        .unwrap();

    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(report.uploads, 0);
    assert_eq!(drive.calls().await, 0);
    assert!(!dir.path().join("large_files").exists());
}

#[tokio::test]
async fn test_upload_large_needs_no_source_folder() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "movie.mp4", Some("video/mp4"), 3 * GIB, "video-bytes")
        .await;
    orchestrator(config(&dir), &drive).run_sync().await.unwrap();

    let upload_only = SorterConfig {
        source_folder_id: None,
        ..config(&dir)
    };
    let report = orchestrator(upload_only, &drive)
        .upload_large()
        .await
        .unwrap();

    assert_eq!(report.final_phase, SyncPhase::Done);
    assert_eq!(drive.uploaded_into("videos").await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_sync_without_source_folder_aborts_in_init() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    let no_source = SorterConfig {
        source_folder_id: None,
        ..config(&dir)
    };

    let error = orchestrator(no_source, &drive).run_sync().await.unwrap_err();

    match error {
        SyncError::PhaseFailed { phase, source } => {
            assert_eq!(phase, SyncPhase::Init);
            assert!(matches!(*source, SyncError::Config(_)));
        }
        other => panic!("expected PhaseFailed, got {:?}", other),
    }
    assert_eq!(drive.calls().await, 0);
    assert!(!dir.path().join("downloaded_files").exists());
}

// ============================================================================
// Cleanup and large staging switches
// ============================================================================

#[tokio::test]
async fn test_cleanup_switches_are_independent() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "img_0001.jpg", Some("image/jpeg"), 10, "faces:0")
        .await;
    drive
        .add_file("2", "movie.mp4", Some("video/mp4"), 2 * GIB, "video")
        .await;
    let config = config_with(&dir, |b| {
        b.sweep_normal_after_upload(false)
            .sweep_large_after_upload(true)
    });
    let normal_dir = config.normal_staging_dir.clone();
    let large_dir = config.large_staging_dir.clone();
    let orchestrator = orchestrator(config, &drive);

    let report = orchestrator.run_sync().await.unwrap();
    assert_eq!(report.normal_cleanup, CleanupOutcome::Disabled);
    assert_eq!(file_names(&normal_dir), vec!["img_0001.jpg"]);
    assert_eq!(file_names(&large_dir), vec!["movie.mp4"]);

    let report = orchestrator.upload_large().await.unwrap();
    assert_eq!(report.large_cleanup, CleanupOutcome::Swept { removed: 1 });
    assert!(file_names(&large_dir).is_empty());
    assert_eq!(file_names(&normal_dir), vec!["img_0001.jpg"]);
}

#[tokio::test]
async fn test_large_files_left_on_remote_when_staging_disabled() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(InMemoryDrive::new(100));
    drive
        .add_file("1", "movie.mp4", Some("video/mp4"), 2 * GIB, "video")
        .await;
    let config = config_with(&dir, |b| b.stage_large_files(false));
    let large_dir = config.large_staging_dir.clone();

    let report = orchestrator(config, &drive).run_sync().await.unwrap();

    assert_eq!(report.large_not_staged, 1);
    assert_eq!(report.downloaded_large, 0);
    assert!(file_names(&large_dir).is_empty());
}
