//! Drive media sorter facade crate.
//!
//! Re-exports the workspace crates so a host can depend on
//! `drive-media-sorter` alone: the capability traits, run configuration and
//! logging, the Google Drive connector and the sorter pipeline.

pub use bridge_traits as bridge;
pub use core_runtime as runtime;
pub use core_sync as sync;
pub use provider_google_drive as google_drive;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;

pub use core_runtime::{SorterConfig, ThresholdConfig};
pub use core_sync::{SyncError, SyncOrchestrator, SyncPhase, SyncReport};
