use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use voxlink_core::VoxlinkResult;
use voxlink_media::{StreamProfile, VideoSource};

/// What the engine asks the platform for at session start.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Whether a camera track is wanted alongside the microphone.
    pub vision: bool,
    /// Resolution/frame-rate constraints for the camera.
    pub profile: StreamProfile,
}

/// Everything acquired for one session.
///
/// The engine owns this exclusively for the session's duration; dropping
/// it releases the underlying tracks. The implementation must not leak
/// partially acquired devices: if the camera fails after the microphone
/// was granted, the microphone is released before the error returns.
pub struct CapturedMedia {
    /// Microphone frames as fixed-size blocks of f32 samples at 16 kHz.
    pub mic: mpsc::Receiver<Vec<f32>>,
    /// Camera frame source, present when vision was requested.
    pub camera: Option<Arc<dyn VideoSource>>,
}

/// Platform boundary for local media devices.
///
/// Acquisition suspends until permission and hardware are ready; display
/// capture is requested separately, mid-session, for screen sharing.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire the microphone (and camera, per the request).
    async fn acquire(&self, request: &CaptureRequest) -> VoxlinkResult<CapturedMedia>;

    /// Start a display capture for screen sharing.
    async fn capture_display(&self) -> VoxlinkResult<Arc<dyn VideoSource>>;
}
