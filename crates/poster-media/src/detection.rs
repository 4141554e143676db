//! Face detection provider trait.
//!
//! Detection services are collaborators: only their output contract
//! matters here. Implementations live in `poster-ml-client`.

use async_trait::async_trait;
use poster_models::DetectedFace;

use crate::error::MediaResult;

/// Face detection provider.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detect faces in an encoded image.
    ///
    /// An empty vector means the service ran and found nothing.
    async fn detect(&self, image: &[u8]) -> MediaResult<Vec<DetectedFace>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
