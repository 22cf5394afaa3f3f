//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media sorter:
//! - Logging and tracing infrastructure
//! - Run configuration (folders, staging paths, thresholds, cleanup policy)
//!
//! ## Overview
//!
//! Everything here is read once at startup and immutable for the rest of a
//! run. Components receive a [`config::SorterConfig`] (or the part of it they
//! need) at construction instead of reading ambient global state.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CleanupPolicy, FolderNames, SorterConfig, ThresholdConfig};
pub use error::{Error, Result};
