//! # Google Drive Provider
//!
//! Implements `RemoteStore` for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Session check against the `about` endpoint
//! - Paginated child listing filtered to images and videos
//! - Whole-file downloads and multipart uploads
//! - Lookup-or-create of destination subfolders
//! - Exponential backoff for rate limiting and server errors
//!
//! Authentication is out of scope: the connector is handed a bearer token
//! obtained elsewhere.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
