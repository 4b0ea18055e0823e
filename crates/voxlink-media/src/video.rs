use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// A source of encoded JPEG frames (camera or display capture).
///
/// `grab_frame` returning `None` means "no current frame" (e.g. mid
/// camera swap) and is not an error; the sampler skips the tick.
pub trait VideoSource: Send + Sync {
    /// The most recent frame as encoded JPEG bytes, if one exists.
    fn grab_frame(&self) -> Option<Vec<u8>>;

    /// Whether the source has ended (display capture stopped by the
    /// platform-level "stop sharing" affordance).
    fn is_ended(&self) -> bool {
        false
    }
}

enum ActiveSource {
    Camera,
    Display(Arc<dyn VideoSource>),
}

/// The video track feeding the server, swappable between the camera and
/// a display capture without restarting the session.
///
/// The camera source is owned for the whole session; display capture is
/// a temporary overlay that always falls back to the camera.
pub struct VideoFeed {
    camera: Arc<dyn VideoSource>,
    active: RwLock<ActiveSource>,
}

impl VideoFeed {
    /// Creates a feed backed by the given camera source.
    pub fn new(camera: Arc<dyn VideoSource>) -> Self {
        Self {
            camera,
            active: RwLock::new(ActiveSource::Camera),
        }
    }

    /// Substitutes a display-capture source for the camera.
    pub fn set_display(&self, display: Arc<dyn VideoSource>) {
        info!("video feed switched to display capture");
        *self.active.write() = ActiveSource::Display(display);
    }

    /// Restores the camera as the active source.
    pub fn restore_camera(&self) {
        info!("video feed restored to camera");
        *self.active.write() = ActiveSource::Camera;
    }

    /// Whether display capture is currently active.
    pub fn is_sharing(&self) -> bool {
        matches!(*self.active.read(), ActiveSource::Display(_))
    }

    /// Restores the camera if the active display capture has ended.
    /// Returns `true` when a restore just happened, so the caller can
    /// surface the state change.
    pub fn reconcile(&self) -> bool {
        let ended = match &*self.active.read() {
            ActiveSource::Display(d) => d.is_ended(),
            ActiveSource::Camera => false,
        };
        if ended {
            self.restore_camera();
        }
        ended
    }

    /// Grabs a frame from whichever source is active.
    pub fn grab_frame(&self) -> Option<Vec<u8>> {
        match &*self.active.read() {
            ActiveSource::Camera => self.camera.grab_frame(),
            ActiveSource::Display(d) => d.grab_frame(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticSource {
        frame: Option<Vec<u8>>,
        ended: AtomicBool,
    }

    impl StaticSource {
        fn new(frame: Option<Vec<u8>>) -> Arc<Self> {
            Arc::new(Self {
                frame,
                ended: AtomicBool::new(false),
            })
        }
    }

    impl VideoSource for StaticSource {
        fn grab_frame(&self) -> Option<Vec<u8>> {
            self.frame.clone()
        }
        fn is_ended(&self) -> bool {
            self.ended.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn swap_and_restore() {
        let camera = StaticSource::new(Some(vec![1]));
        let display = StaticSource::new(Some(vec![2]));
        let feed = VideoFeed::new(camera);

        assert_eq!(feed.grab_frame(), Some(vec![1]));
        assert!(!feed.is_sharing());

        feed.set_display(display);
        assert!(feed.is_sharing());
        assert_eq!(feed.grab_frame(), Some(vec![2]));

        feed.restore_camera();
        assert!(!feed.is_sharing());
        assert_eq!(feed.grab_frame(), Some(vec![1]));
    }

    #[test]
    fn ended_display_restores_camera_on_reconcile() {
        let camera = StaticSource::new(Some(vec![1]));
        let display = StaticSource::new(Some(vec![2]));
        let feed = VideoFeed::new(camera);

        feed.set_display(display.clone());
        assert!(!feed.reconcile());

        display.ended.store(true, Ordering::SeqCst);
        assert!(feed.reconcile());
        assert!(!feed.is_sharing());
        assert_eq!(feed.grab_frame(), Some(vec![1]));

        // Already restored; nothing further to report.
        assert!(!feed.reconcile());
    }

    #[test]
    fn missing_frame_is_skipped_silently() {
        let camera = StaticSource::new(None);
        let feed = VideoFeed::new(camera);
        assert_eq!(feed.grab_frame(), None);
    }
}
