//! # Content Classifier
//!
//! Decides which destination categories a staged file is uploaded to.
//!
//! ## Rules
//!
//! - Anything that is not `image/*` or `video/*` is `Unclassified` and yields
//!   no targets.
//! - Videos go to `Video` only.
//! - Images always go to `Image` (primary), plus at most one secondary:
//!   - name contains `DSC`: `DSLRImage`, replaced by `GroupPhoto` when the
//!     face count exceeds the threshold
//!   - else name contains `GPS`: `GeotaggedImage`, no face count
//!   - else `GroupPhoto` when the face count exceeds the threshold
//!
//! Name hints are literal, case-sensitive substring checks.

use bridge_traits::vision::FaceDetector;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Destination category of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Image,
    Video,
    DslrImage,
    GroupPhoto,
    GeotaggedImage,
    Unclassified,
}

impl Category {
    /// Categories that own a destination folder.
    pub const UPLOADABLE: [Category; 5] = [
        Category::Image,
        Category::Video,
        Category::DslrImage,
        Category::GroupPhoto,
        Category::GeotaggedImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "Image",
            Category::Video => "Video",
            Category::DslrImage => "DSLRImage",
            Category::GroupPhoto => "GroupPhoto",
            Category::GeotaggedImage => "GeotaggedImage",
            Category::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media kind derived from a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            MediaKind::Image
        } else if mime_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// Kind of an optional MIME type; a missing type is `Other`.
    pub fn from_optional_mime(mime_type: Option<&str>) -> Self {
        mime_type.map(Self::from_mime).unwrap_or(MediaKind::Other)
    }
}

/// Secondary-category hint carried by a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHint {
    Dslr,
    Geotagged,
    None,
}

impl NameHint {
    /// `DSC` wins over `GPS` when a name contains both.
    pub fn from_file_name(name: &str) -> Self {
        if name.contains("DSC") {
            NameHint::Dslr
        } else if name.contains("GPS") {
            NameHint::Geotagged
        } else {
            NameHint::None
        }
    }
}

/// One upload destination for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTarget {
    pub category: Category,
    pub is_primary: bool,
}

impl CategoryTarget {
    fn primary(category: Category) -> Self {
        Self {
            category,
            is_primary: true,
        }
    }

    fn secondary(category: Category) -> Self {
        Self {
            category,
            is_primary: false,
        }
    }
}

/// Whether the face-count heuristic is consulted for this combination.
pub fn needs_face_count(kind: MediaKind, hint: NameHint) -> bool {
    kind == MediaKind::Image && hint != NameHint::Geotagged
}

/// Ordered targets for a file. `group_photo` is the heuristic's verdict,
/// `None` when it was not run.
pub fn categories_for(
    kind: MediaKind,
    hint: NameHint,
    group_photo: Option<bool>,
) -> Vec<CategoryTarget> {
    let group_photo = group_photo.unwrap_or(false);

    match kind {
        MediaKind::Other => Vec::new(),
        MediaKind::Video => vec![CategoryTarget::primary(Category::Video)],
        MediaKind::Image => {
            let mut targets = vec![CategoryTarget::primary(Category::Image)];
            let secondary = match hint {
                NameHint::Dslr if group_photo => Some(Category::GroupPhoto),
                NameHint::Dslr => Some(Category::DslrImage),
                NameHint::Geotagged => Some(Category::GeotaggedImage),
                NameHint::None if group_photo => Some(Category::GroupPhoto),
                NameHint::None => None,
            };
            targets.extend(secondary.map(CategoryTarget::secondary));
            targets
        }
    }
}

/// Classifies staged files, running face detection only when a rule needs it.
pub struct ContentClassifier {
    detector: Arc<dyn FaceDetector>,
    group_photo_threshold: usize,
}

impl ContentClassifier {
    pub fn new(detector: Arc<dyn FaceDetector>, group_photo_threshold: usize) -> Self {
        Self {
            detector,
            group_photo_threshold,
        }
    }

    /// Targets for a file named `name` of `kind` with bytes `content`.
    pub async fn classify(&self, name: &str, kind: MediaKind, content: &Bytes) -> Vec<CategoryTarget> {
        let hint = NameHint::from_file_name(name);

        let group_photo = if needs_face_count(kind, hint) {
            Some(self.is_group_photo(name, content).await)
        } else {
            None
        };

        let targets = categories_for(kind, hint, group_photo);
        debug!(
            file = %name,
            ?kind,
            ?hint,
            ?group_photo,
            targets = targets.len(),
            "Classified file"
        );
        targets
    }

    /// Strictly more faces than the threshold. Detection failures count as
    /// "not a group photo".
    pub async fn is_group_photo(&self, name: &str, content: &Bytes) -> bool {
        match self.detector.count_faces(content.clone()).await {
            Ok(faces) => faces > self.group_photo_threshold,
            Err(e) => {
                warn!(file = %name, error = %e, "Face detection failed, treating as not a group photo");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFaces {
        faces: Option<usize>,
        calls: AtomicUsize,
    }

    impl FixedFaces {
        fn new(faces: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                faces,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FaceDetector for FixedFaces {
        async fn count_faces(&self, _image: Bytes) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.faces
                .ok_or_else(|| BridgeError::Undecodable("corrupt".to_string()))
        }
    }

    fn categories(targets: &[CategoryTarget]) -> Vec<Category> {
        targets.iter().map(|t| t.category).collect()
    }

    async fn classify(name: &str, mime: &str, faces: Option<usize>) -> (Vec<CategoryTarget>, usize) {
        let detector = FixedFaces::new(faces);
        let classifier = ContentClassifier::new(detector.clone(), 15);
        let targets = classifier
            .classify(name, MediaKind::from_mime(mime), &Bytes::from_static(b"img"))
            .await;
        (targets, detector.calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("video/quicktime"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Other);
        assert_eq!(MediaKind::from_optional_mime(None), MediaKind::Other);
    }

    #[test]
    fn test_name_hints_are_case_sensitive() {
        assert_eq!(NameHint::from_file_name("DSC_0042.jpg"), NameHint::Dslr);
        assert_eq!(NameHint::from_file_name("dsc_0042.jpg"), NameHint::None);
        assert_eq!(NameHint::from_file_name("trip_GPS.jpg"), NameHint::Geotagged);
        assert_eq!(NameHint::from_file_name("gps.jpg"), NameHint::None);
        assert_eq!(NameHint::from_file_name("DSC_GPS.jpg"), NameHint::Dslr);
    }

    #[test]
    fn test_image_is_always_primary() {
        for hint in [NameHint::Dslr, NameHint::Geotagged, NameHint::None] {
            for verdict in [None, Some(false), Some(true)] {
                let targets = categories_for(MediaKind::Image, hint, verdict);
                assert_eq!(targets[0], CategoryTarget::primary(Category::Image));
                assert!(targets.len() <= 2);
                assert!(targets[1..].iter().all(|t| !t.is_primary));
            }
        }
    }

    #[test]
    fn test_classification_grid() {
        use Category::*;
        let cases = [
            (NameHint::Dslr, Some(false), vec![Image, DslrImage]),
            (NameHint::Dslr, Some(true), vec![Image, GroupPhoto]),
            (NameHint::Geotagged, None, vec![Image, GeotaggedImage]),
            (NameHint::None, Some(false), vec![Image]),
            (NameHint::None, Some(true), vec![Image, GroupPhoto]),
        ];

        for (hint, verdict, expected) in cases {
            assert_eq!(
                categories(&categories_for(MediaKind::Image, hint, verdict)),
                expected,
                "hint {:?} verdict {:?}",
                hint,
                verdict
            );
        }
    }

    #[test]
    fn test_video_and_other() {
        assert_eq!(
            categories_for(MediaKind::Video, NameHint::Dslr, None),
            vec![CategoryTarget::primary(Category::Video)]
        );
        assert!(categories_for(MediaKind::Other, NameHint::None, None).is_empty());
    }

    #[tokio::test]
    async fn test_face_threshold_is_strict() {
        let (at_threshold, _) = classify("party.jpg", "image/jpeg", Some(15)).await;
        assert_eq!(categories(&at_threshold), vec![Category::Image]);

        let (above, _) = classify("party.jpg", "image/jpeg", Some(16)).await;
        assert_eq!(
            categories(&above),
            vec![Category::Image, Category::GroupPhoto]
        );
    }

    #[tokio::test]
    async fn test_dslr_group_photo_replaces_dslr() {
        let (targets, calls) = classify("DSC_0042.jpg", "image/jpeg", Some(20)).await;
        assert_eq!(
            categories(&targets),
            vec![Category::Image, Category::GroupPhoto]
        );
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_geotagged_skips_face_count() {
        let (targets, calls) = classify("img_GPS_7.jpg", "image/jpeg", Some(40)).await;
        assert_eq!(
            categories(&targets),
            vec![Category::Image, Category::GeotaggedImage]
        );
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_video_skips_face_count() {
        let (targets, calls) = classify("DSC_clip.mp4", "video/mp4", Some(40)).await;
        assert_eq!(categories(&targets), vec![Category::Video]);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_undecodable_image_is_not_group_photo() {
        let (targets, calls) = classify("DSC_0001.jpg", "image/jpeg", None).await;
        assert_eq!(
            categories(&targets),
            vec![Category::Image, Category::DslrImage]
        );
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_non_media_yields_nothing() {
        let (targets, calls) = classify("notes.pdf", "application/pdf", Some(40)).await;
        assert!(targets.is_empty());
        assert_eq!(calls, 0);
    }
}
