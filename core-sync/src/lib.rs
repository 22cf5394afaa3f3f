//! # Sync Module
//!
//! Classification-and-routing pipeline of the media sorter.
//!
//! ## Overview
//!
//! A pass pulls images and videos from a source folder, stages them locally,
//! decides their destination categories and uploads them into one folder per
//! category under a destination root.
//!
//! ## Components
//!
//! - **Size Router** (`routing`): picks the normal or large staging area by declared size
//! - **Content Classifier** (`classifier`): MIME kind, `DSC`/`GPS` name hints and a face-count heuristic
//! - **Staging Manager** (`staging`): creation, listing and policy-gated sweep of staging areas
//! - **Destination Folders** (`folders`): lookup-or-create of one folder per category
//! - **Remote Pager** (`pager`): lazy walk over a paginated listing
//! - **Pass State Machine** (`pass`): validated phase transitions
//! - **Sync Orchestrator** (`orchestrator`): `run_sync` and `upload_large` entry points

pub mod classifier;
pub mod error;
pub mod folders;
pub mod orchestrator;
pub mod pager;
pub mod pass;
pub mod report;
pub mod routing;
pub mod staging;

pub use classifier::{categories_for, Category, CategoryTarget, ContentClassifier, MediaKind, NameHint};
pub use error::{Result, SyncError};
pub use folders::DestinationFolderSet;
pub use orchestrator::SyncOrchestrator;
pub use pager::RemotePager;
pub use pass::{PassKind, SyncPass, SyncPhase};
pub use report::SyncReport;
pub use routing::{route, StagingTarget};
pub use staging::{CleanupOutcome, StagedFile, StagingArea, StagingManager};
