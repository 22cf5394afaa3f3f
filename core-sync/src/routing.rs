//! Size-based choice of the local staging area.

use bridge_traits::storage::RemoteFile;
use std::fmt;

/// Local staging area a downloaded file lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingTarget {
    Normal,
    Large,
}

impl StagingTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagingTarget::Normal => "normal",
            StagingTarget::Large => "large",
        }
    }
}

impl fmt::Display for StagingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route a record by its declared size.
///
/// Only a size strictly above `threshold_bytes` goes to `Large`. Unknown
/// or zero sizes stay `Normal`.
pub fn route(file: &RemoteFile, threshold_bytes: u64) -> StagingTarget {
    match file.size {
        Some(size) if size > threshold_bytes => StagingTarget::Large,
        _ => StagingTarget::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn sized(size: Option<u64>) -> RemoteFile {
        RemoteFile::new("id", "movie.mp4", Some("video/mp4"), size)
    }

    #[test]
    fn test_route_boundary() {
        assert_eq!(route(&sized(Some(GIB)), GIB), StagingTarget::Normal);
        assert_eq!(route(&sized(Some(GIB + 1)), GIB), StagingTarget::Large);
        assert_eq!(route(&sized(Some(GIB - 1)), GIB), StagingTarget::Normal);
    }

    #[test]
    fn test_route_unknown_or_zero_size_is_normal() {
        assert_eq!(route(&sized(None), GIB), StagingTarget::Normal);
        assert_eq!(route(&sized(Some(0)), GIB), StagingTarget::Normal);
    }

    #[test]
    fn test_route_with_zero_threshold() {
        assert_eq!(route(&sized(Some(1)), 0), StagingTarget::Large);
        assert_eq!(route(&sized(Some(0)), 0), StagingTarget::Normal);
    }
}
