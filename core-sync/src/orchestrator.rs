//! # Sync Orchestrator
//!
//! Drives a sorter pass end to end and is the composition root of the core.
//!
//! ## Workflow
//!
//! ### Sync pass (`run_sync`)
//! 1. Check a source folder is configured, ensure both staging areas and
//!    verify the remote session
//! 2. Page through the source folder; download normal-sized files
//! 3. Download large files into the large area (when enabled)
//! 4. Resolve or create the destination folders
//! 5. Classify and upload every file in the normal area
//! 6. Sweep the normal area if its cleanup switch is on
//!
//! ### Large-file pass (`upload_large`)
//! 1. Stop early with an empty report if the large area does not exist
//! 2. Verify the session and provision folders
//! 3. Classify and upload every file in the large area
//! 4. Sweep the large area if its cleanup switch is on
//!
//! Per-file failures are logged, counted in the [`SyncReport`] and skipped.
//! Session, listing, staging and provisioning failures abort the pass with
//! [`SyncError::PhaseFailed`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncOrchestrator;
//!
//! let orchestrator = SyncOrchestrator::new(config, store, fs, detector);
//! let report = orchestrator.run_sync().await?;
//! println!("{}", report);
//! ```

use bridge_traits::storage::{FileSystemAccess, ListFilter, RemoteFile, RemoteStore};
use bridge_traits::vision::FaceDetector;
use core_runtime::SorterConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::{ContentClassifier, MediaKind};
use crate::error::{Result, SyncError};
use crate::folders::DestinationFolderSet;
use crate::pager::RemotePager;
use crate::pass::{PassKind, SyncPass, SyncPhase};
use crate::report::SyncReport;
use crate::routing::{route, StagingTarget};
use crate::staging::{StagingArea, StagingManager};

/// Records downloaded in this run, keyed by staged file name.
type StagedRecords = HashMap<String, RemoteFile>;

pub struct SyncOrchestrator {
    config: SorterConfig,
    store: Arc<dyn RemoteStore>,
    staging: StagingManager,
    classifier: ContentClassifier,
}

impl SyncOrchestrator {
    pub fn new(
        config: SorterConfig,
        store: Arc<dyn RemoteStore>,
        fs: Arc<dyn FileSystemAccess>,
        detector: Arc<dyn FaceDetector>,
    ) -> Self {
        let staging = StagingManager::new(
            fs,
            config.normal_staging_dir.clone(),
            config.large_staging_dir.clone(),
        );
        let classifier =
            ContentClassifier::new(detector, config.thresholds.group_photo_threshold);

        Self {
            config,
            store,
            staging,
            classifier,
        }
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Run a full sync pass over the normal area. Large files are staged,
    /// not uploaded.
    ///
    /// # Errors
    ///
    /// Returns `PhaseFailed` naming the phase of the first fatal error.
    #[instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<SyncReport> {
        let mut pass = SyncPass::new(PassKind::Sync);
        let mut report = SyncReport::new(PassKind::Sync);

        let source = self
            .config
            .require_source()
            .map_err(|e| abort(&mut pass, e.into()))?;

        info!(source = %source, "Phase 1: Preparing staging areas and session");
        let normal = self
            .staging
            .ensure(StagingTarget::Normal)
            .await
            .map_err(|e| abort(&mut pass, e))?;
        let large = self
            .staging
            .ensure(StagingTarget::Large)
            .await
            .map_err(|e| abort(&mut pass, e))?;
        self.store
            .verify_session()
            .await
            .map_err(|e| abort(&mut pass, e.into()))?;

        pass.advance(SyncPhase::DownloadNormal)?;
        info!("Phase 2: Downloading from source folder");
        let (records, deferred) = self
            .download_normal(source, &normal, &mut report)
            .await
            .map_err(|e| abort(&mut pass, e))?;

        if !deferred.is_empty() {
            pass.advance(SyncPhase::DownloadLarge)?;
            info!("Phase 3: Staging {} large files", deferred.len());
            self.download_large(&large, deferred, &mut report).await;
        }

        pass.advance(SyncPhase::ProvisionFolders)?;
        info!("Phase 4: Provisioning destination folders");
        let folders = self
            .provision_folders()
            .await
            .map_err(|e| abort(&mut pass, e))?;

        pass.advance(SyncPhase::UploadNormal)?;
        info!("Phase 5: Uploading normal staging area");
        self.upload_area(&normal, &records, &folders, &mut report)
            .await
            .map_err(|e| abort(&mut pass, e))?;

        pass.advance(SyncPhase::Cleanup)?;
        report.normal_cleanup = self
            .staging
            .sweep_if(&normal, self.config.cleanup.sweep_normal)
            .await;

        pass.advance(SyncPhase::Done)?;
        report.final_phase = pass.phase();
        info!("{}", report);
        Ok(report)
    }

    /// Upload what an earlier sync staged in the large area.
    ///
    /// Returns an empty report without contacting the remote store when the
    /// large area does not exist.
    ///
    /// # Errors
    ///
    /// Returns `PhaseFailed` naming the phase of the first fatal error.
    #[instrument(skip(self), fields(area = %self.config.large_staging_dir.display()))]
    pub async fn upload_large(&self) -> Result<SyncReport> {
        let mut pass = SyncPass::new(PassKind::UploadLarge);
        let mut report = SyncReport::new(PassKind::UploadLarge);

        let large = self
            .staging
            .existing(StagingTarget::Large)
            .await
            .map_err(|e| abort(&mut pass, e))?;

        let Some(large) = large else {
            info!("Large staging area does not exist, nothing to upload");
            pass.advance(SyncPhase::Done)?;
            report.final_phase = pass.phase();
            return Ok(report);
        };

        self.store
            .verify_session()
            .await
            .map_err(|e| abort(&mut pass, e.into()))?;

        pass.advance(SyncPhase::ProvisionFolders)?;
        info!("Phase 1: Provisioning destination folders");
        let folders = self
            .provision_folders()
            .await
            .map_err(|e| abort(&mut pass, e))?;

        pass.advance(SyncPhase::UploadLarge)?;
        info!("Phase 2: Uploading large staging area");
        self.upload_area(&large, &StagedRecords::new(), &folders, &mut report)
            .await
            .map_err(|e| abort(&mut pass, e))?;

        pass.advance(SyncPhase::Cleanup)?;
        report.large_cleanup = self
            .staging
            .sweep_if(&large, self.config.cleanup.sweep_large)
            .await;

        pass.advance(SyncPhase::Done)?;
        report.final_phase = pass.phase();
        info!("{}", report);
        Ok(report)
    }

    /// Walk the full source listing. Normal records are downloaded now;
    /// large records are returned for the large-area phase.
    async fn download_normal(
        &self,
        source: &str,
        normal: &StagingArea,
        report: &mut SyncReport,
    ) -> Result<(StagedRecords, Vec<RemoteFile>)> {
        let mut pager = RemotePager::new(
            self.store.as_ref(),
            source,
            ListFilter::images_and_videos(),
        );
        let threshold = self.config.thresholds.size_threshold_bytes;

        let mut records = StagedRecords::new();
        let mut deferred = Vec::new();

        while let Some(record) = pager.next().await? {
            report.listed += 1;

            match route(&record, threshold) {
                StagingTarget::Large if self.config.stage_large_files => {
                    debug!(file = %record.name, size = ?record.size, "Deferring large file");
                    deferred.push(record);
                }
                StagingTarget::Large => {
                    info!(file = %record.name, size = ?record.size, "Large file left on remote");
                    report.large_not_staged += 1;
                }
                StagingTarget::Normal => {
                    if let Some(staged) = self.download_into(normal, &record).await {
                        records.insert(staged, record);
                        report.downloaded_normal += 1;
                    } else {
                        report.download_failures += 1;
                    }
                }
            }
        }

        info!(
            listed = report.listed,
            downloaded = report.downloaded_normal,
            deferred = deferred.len(),
            pages = pager.pages_fetched(),
            "Source listing finished"
        );
        Ok((records, deferred))
    }

    async fn download_large(
        &self,
        large: &StagingArea,
        deferred: Vec<RemoteFile>,
        report: &mut SyncReport,
    ) {
        for record in deferred {
            if self.download_into(large, &record).await.is_some() {
                report.downloaded_large += 1;
            } else {
                report.download_failures += 1;
            }
        }
    }

    /// Download one record into `area`. Returns the staged file name, or
    /// `None` after logging the failure.
    async fn download_into(&self, area: &StagingArea, record: &RemoteFile) -> Option<String> {
        let data = match self.store.download(&record.id).await {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %record.name, file_id = %record.id, error = %e, "Download failed, skipping");
                return None;
            }
        };

        match area.write(record, data).await {
            Ok(staged) => Some(staged.file_name()),
            Err(e) => {
                warn!(file = %record.name, area = %area.target(), error = %e, "Staging write failed, skipping");
                None
            }
        }
    }

    async fn provision_folders(&self) -> Result<DestinationFolderSet> {
        DestinationFolderSet::provision(
            self.store.as_ref(),
            &self.config.destination_folder_id,
            &self.config.folder_names,
        )
        .await
    }

    /// Classify and upload every file in `area`, in staged-listing order.
    async fn upload_area(
        &self,
        area: &StagingArea,
        records: &StagedRecords,
        folders: &DestinationFolderSet,
        report: &mut SyncReport,
    ) -> Result<()> {
        let staged_files = area.list().await?;
        info!(area = %area.target(), files = staged_files.len(), "Uploading staged files");

        for mut staged in staged_files {
            staged.record = records.get(&staged.file_name()).cloned();
            let name = staged.display_name();

            let mime_type = staged.mime_type();
            let kind = MediaKind::from_optional_mime(mime_type.as_deref());
            if kind == MediaKind::Other {
                info!(file = %name, mime = ?mime_type, "Not an image or video, skipping");
                report.skipped_unclassified += 1;
                continue;
            }

            let content = match area.read(&staged).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %name, error = %e, "Failed to read staged file, skipping");
                    report.upload_failures += 1;
                    continue;
                }
            };

            let targets = self.classifier.classify(&name, kind, &content).await;
            for target in targets {
                let Some(folder_id) = folders.get(target.category) else {
                    warn!(file = %name, category = %target.category, "No folder for category, skipping");
                    report.upload_failures += 1;
                    continue;
                };

                match self
                    .store
                    .upload(content.clone(), folder_id, &name, mime_type.as_deref())
                    .await
                {
                    Ok(remote_id) => {
                        info!(
                            file = %name,
                            category = %target.category,
                            primary = target.is_primary,
                            remote_id = %remote_id,
                            "Uploaded"
                        );
                        report.uploads += 1;
                    }
                    Err(e) => {
                        warn!(file = %name, category = %target.category, error = %e, "Upload failed, skipping");
                        report.upload_failures += 1;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Move `pass` to `Failed` and wrap `err` with the phase it failed in.
fn abort(pass: &mut SyncPass, err: SyncError) -> SyncError {
    let phase = pass.fail(err.to_string());
    error!(phase = %phase, error = %err, "Sync pass aborted");
    SyncError::PhaseFailed {
        phase,
        source: Box::new(err),
    }
}
