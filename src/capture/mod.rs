//! Image capture sources.
//!
//! The pipeline consumes one capability from a camera: encoded image bytes on
//! demand. Sources here are a scripted mock camera and a local file source.
//! Captures run on the blocking pool through [`capture`]. Any capture error
//! aborts the detection attempt before classification.

pub mod file;
pub mod mock;

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

pub use file::{FileImageSource, FileStats};
pub use mock::MockCamera;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera permission is required to detect USB cables")]
    PermissionDenied,
    #[error("camera is not available on this device")]
    DeviceUnavailable,
    #[error("camera session is not running")]
    SessionNotRunning,
    #[error("camera capture failed: {0}")]
    CaptureFailed(String),
}

/// Produces encoded (JPEG/PNG) image bytes.
pub trait ImageSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &str;

    fn capture_image(&mut self) -> Result<Vec<u8>, CaptureError>;
}

/// Source handle shared with the blocking capture task.
pub type SharedSource<S> = Arc<Mutex<S>>;

pub fn shared<S: ImageSource>(source: S) -> SharedSource<S> {
    Arc::new(Mutex::new(source))
}

/// Capture one image on the blocking pool. Sources may block on device IO
/// or disk reads.
pub async fn capture<S>(source: &SharedSource<S>) -> Result<Vec<u8>, CaptureError>
where
    S: ImageSource + 'static,
{
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || {
        let mut source = source.lock();
        source.capture_image().map_err(|err| {
            log::warn!("capture from {} failed: {}", source.name(), err);
            err
        })
    })
    .await
    .map_err(|e| CaptureError::CaptureFailed(format!("capture task failed: {}", e)))?
}
