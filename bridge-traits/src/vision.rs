//! Face detection capability
//!
//! The classifier only consumes a face count; the detection model lives
//! behind this trait so deterministic stubs can replace it in tests.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Counts distinct face regions in an encoded image.
///
/// Implementations use fixed detection sensitivity; nothing is tunable per
/// call.
///
/// # Errors
///
/// Returns [`BridgeError::Undecodable`](crate::error::BridgeError::Undecodable)
/// when the bytes are not a decodable image. Callers decide how to degrade.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn count_faces(&self, image: Bytes) -> Result<usize>;
}
