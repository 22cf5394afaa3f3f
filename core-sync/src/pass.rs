//! # Sync Pass State Machine
//!
//! Tracks the phase of one sorter pass with validated transitions.
//!
//! ## State Machine
//!
//! ```text
//! sync pass:
//!   Init → DownloadNormal → [DownloadLarge] → ProvisionFolders → UploadNormal → Cleanup → Done
//!
//! upload-large pass:
//!   Init → ProvisionFolders → UploadLarge → Cleanup → Done
//!   Init → Done                       (nothing staged)
//!
//! any non-terminal phase → Failed
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::pass::{PassKind, SyncPass, SyncPhase};
//!
//! let mut pass = SyncPass::new(PassKind::Sync);
//! pass.advance(SyncPhase::DownloadNormal)?;
//! pass.advance(SyncPhase::ProvisionFolders)?;
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Result, SyncError};

/// Which entry point a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Download, classify and upload the normal area
    Sync,
    /// Upload what an earlier sync staged in the large area
    UploadLarge,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Sync => "sync",
            PassKind::UploadLarge => "upload-large",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    Init,
    DownloadNormal,
    DownloadLarge,
    ProvisionFolders,
    UploadNormal,
    UploadLarge,
    Cleanup,
    Done,
    Failed,
}

impl SyncPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Done | SyncPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Init => "Init",
            SyncPhase::DownloadNormal => "DownloadNormal",
            SyncPhase::DownloadLarge => "DownloadLarge",
            SyncPhase::ProvisionFolders => "ProvisionFolders",
            SyncPhase::UploadNormal => "UploadNormal",
            SyncPhase::UploadLarge => "UploadLarge",
            SyncPhase::Cleanup => "Cleanup",
            SyncPhase::Done => "Done",
            SyncPhase::Failed => "Failed",
        }
    }

    /// Whether a pass of `kind` may move from `self` to `next`.
    pub fn can_transition_to(&self, next: SyncPhase, kind: PassKind) -> bool {
        use SyncPhase::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        match kind {
            PassKind::Sync => matches!(
                (*self, next),
                (Init, DownloadNormal)
                    | (DownloadNormal, DownloadLarge)
                    | (DownloadNormal, ProvisionFolders)
                    | (DownloadLarge, ProvisionFolders)
                    | (ProvisionFolders, UploadNormal)
                    | (UploadNormal, Cleanup)
                    | (Cleanup, Done)
            ),
            PassKind::UploadLarge => matches!(
                (*self, next),
                (Init, ProvisionFolders)
                    | (Init, Done)
                    | (ProvisionFolders, UploadLarge)
                    | (UploadLarge, Cleanup)
                    | (Cleanup, Done)
            ),
        }
    }
}

impl FromStr for SyncPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let phase = match s {
            "Init" => SyncPhase::Init,
            "DownloadNormal" => SyncPhase::DownloadNormal,
            "DownloadLarge" => SyncPhase::DownloadLarge,
            "ProvisionFolders" => SyncPhase::ProvisionFolders,
            "UploadNormal" => SyncPhase::UploadNormal,
            "UploadLarge" => SyncPhase::UploadLarge,
            "Cleanup" => SyncPhase::Cleanup,
            "Done" => SyncPhase::Done,
            "Failed" => SyncPhase::Failed,
            other => {
                return Err(SyncError::InvalidStateTransition {
                    from: other.to_string(),
                    to: other.to_string(),
                    reason: "Unknown phase".to_string(),
                })
            }
        };
        Ok(phase)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pass through the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPass {
    kind: PassKind,
    phase: SyncPhase,
    history: Vec<SyncPhase>,
    failure: Option<(SyncPhase, String)>,
}

impl SyncPass {
    /// Create a pass in `Init`
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            phase: SyncPhase::Init,
            history: vec![SyncPhase::Init],
            failure: None,
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[SyncPhase] {
        &self.history
    }

    /// Phase the pass failed in and the reason, once failed.
    pub fn failure(&self) -> Option<(SyncPhase, &str)> {
        self.failure
            .as_ref()
            .map(|(phase, reason)| (*phase, reason.as_str()))
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the move is not allowed for this
    /// pass kind. Use [`fail`](Self::fail) to enter `Failed`.
    pub fn advance(&mut self, next: SyncPhase) -> Result<()> {
        if next == SyncPhase::Failed || !self.phase.can_transition_to(next, self.kind) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: format!("Not a valid step of a {} pass", self.kind),
            });
        }

        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Enter `Failed`, recording the phase that failed.
    ///
    /// Returns the failed phase. Calling it on an already terminal pass
    /// leaves the pass unchanged and returns its current phase.
    pub fn fail(&mut self, reason: impl Into<String>) -> SyncPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }

        let failed_in = self.phase;
        self.failure = Some((failed_in, reason.into()));
        self.phase = SyncPhase::Failed;
        self.history.push(SyncPhase::Failed);
        failed_in
    }
}
