//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `FaceDetector` using a SeetaFace cascade via `rustface`
//!
//! ## Feature Flags
//!
//! - `face-detection`: Enable the cascade face detector (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{CascadeFaceDetector, ReqwestHttpClient, TokioFileSystem};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let fs = TokioFileSystem::new();
//! let detector = CascadeFaceDetector::new("models/seeta_fd_frontal_v1.0.bin")?;
//! ```

mod filesystem;
mod http;

#[cfg(feature = "face-detection")]
mod vision;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;

#[cfg(feature = "face-detection")]
pub use vision::{CascadeFaceDetector, DEFAULT_SCORE_THRESHOLD};
