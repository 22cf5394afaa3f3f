use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::pass::SyncPhase;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote store error: {0}")]
    Remote(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Staging error at {path}: {source}")]
    Staging {
        path: String,
        #[source]
        source: BridgeError,
    },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Sync aborted during {phase}: {source}")]
    PhaseFailed {
        phase: SyncPhase,
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Phase a pass aborted in, when this error ended one.
    pub fn failed_phase(&self) -> Option<SyncPhase> {
        match self {
            SyncError::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
