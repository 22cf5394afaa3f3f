//! Outcome counters of a pass.

use std::fmt;

use crate::pass::{PassKind, SyncPhase};
use crate::staging::CleanupOutcome;

/// What a completed pass did. Every skipped or failed item is counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: PassKind,
    pub final_phase: SyncPhase,
    /// Records returned by the source listing
    pub listed: u64,
    pub downloaded_normal: u64,
    pub downloaded_large: u64,
    /// Large records left on the remote because large staging is off
    pub large_not_staged: u64,
    pub download_failures: u64,
    /// Staged files with no image or video MIME type
    pub skipped_unclassified: u64,
    /// Successful uploads, one per (file, category)
    pub uploads: u64,
    /// Failed uploads, one per (file, category), plus unreadable staged files
    pub upload_failures: u64,
    pub normal_cleanup: CleanupOutcome,
    pub large_cleanup: CleanupOutcome,
}

impl SyncReport {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            final_phase: SyncPhase::Init,
            listed: 0,
            downloaded_normal: 0,
            downloaded_large: 0,
            large_not_staged: 0,
            download_failures: 0,
            skipped_unclassified: 0,
            uploads: 0,
            upload_failures: 0,
            normal_cleanup: CleanupOutcome::NotRun,
            large_cleanup: CleanupOutcome::NotRun,
        }
    }

    /// True when no per-item failure was recorded.
    pub fn is_clean(&self) -> bool {
        self.download_failures == 0 && self.upload_failures == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pass reached {}: listed {}, downloaded {} normal / {} large, {} download failures, {} skipped, {} uploads, {} upload failures",
            self.kind,
            self.final_phase,
            self.listed,
            self.downloaded_normal,
            self.downloaded_large,
            self.download_failures,
            self.skipped_unclassified,
            self.uploads,
            self.upload_failures
        )
    }
}
