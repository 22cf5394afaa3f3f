//! # Host Bridge Traits
//!
//! Capability traits the sorter core depends on but does not implement itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the classification-and-routing core
//! and the outside world. Each trait is a capability with one or more concrete
//! adapters elsewhere in the workspace:
//!
//! | Trait | Purpose | Adapter |
//! |-------|---------|---------|
//! | [`HttpClient`](http::HttpClient) | Async HTTP with retry | `bridge-desktop` (reqwest) |
//! | [`FileSystemAccess`](storage::FileSystemAccess) | Local staging I/O | `bridge-desktop` (tokio fs) |
//! | [`RemoteStore`](storage::RemoteStore) | List / download / upload / folders | `provider-google-drive` |
//! | [`FaceDetector`](vision::FaceDetector) | Face count for an encoded image | `bridge-desktop` (cascade) |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert their native errors into it and keep the message actionable (file
//! name, folder id, HTTP status).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared behind
//! `Arc<dyn Trait>` by the orchestrator.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::storage::{ListFilter, RemoteStore};
//!
//! async fn first_page(store: &dyn RemoteStore, folder: &str) -> bridge_traits::error::Result<usize> {
//!     let (files, _next) = store
//!         .list_children(folder, &ListFilter::images_and_videos(), None)
//!         .await?;
//!     Ok(files.len())
//! }
//! ```

pub mod error;
pub mod http;
pub mod log;
pub mod storage;
pub mod vision;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use log::LogLevel;
pub use storage::{FileMetadata, FileSystemAccess, ListFilter, RemoteFile, RemoteStore};
pub use vision::FaceDetector;
