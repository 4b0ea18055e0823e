use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use voxlink_core::{DocumentData, GeoPoint, MotionStatus, SecurityStatus, VoxlinkResult};
use voxlink_media::NetworkQuality;

/// Credentials for repository-backed tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// Personal access token.
    pub token: String,
    /// `owner/name` repository slug.
    pub repo: String,
}

/// Live system-status flags snapshotted into each dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    /// Whether the host believes it is online.
    pub is_online: bool,
    /// Whether a camera track is part of the session.
    pub vision_enabled: bool,
    /// Current security gate state.
    pub security: SecurityStatus,
    /// Network classification at session start.
    pub network: NetworkQuality,
    /// Coarse device motion.
    pub motion: MotionStatus,
    /// Last known location, if the provider granted one.
    pub location: Option<GeoPoint>,
    /// Whether coaching mode is active.
    pub coaching_mode: bool,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            is_online: true,
            vision_enabled: false,
            security: SecurityStatus::Open,
            network: NetworkQuality::Optimal,
            motion: MotionStatus::Stationary,
            location: None,
            coaching_mode: false,
        }
    }
}

/// Callbacks into the hosting client for side effects only it can
/// perform. All of them are best-effort from the tool's perspective.
#[async_trait]
pub trait ClientHooks: Send + Sync {
    /// Capture the screen to the named file; returns a confirmation.
    async fn capture_screen(&self, filename: &str) -> VoxlinkResult<String>;
    /// Put text on the clipboard.
    async fn copy_to_clipboard(&self, text: &str) -> VoxlinkResult<()>;
    /// Scan the camera view for QR/barcodes.
    async fn scan_visual_codes(&self) -> VoxlinkResult<Vec<String>>;
    /// Show a coaching tip to the user.
    async fn deliver_coaching_tip(&self, tip: &str);
    /// Tell the client its wallet view is stale.
    async fn refresh_wallet(&self);
}

/// Hooks implementation that does nothing. Useful as a default and in
/// tests that don't care about client side effects.
pub struct NoopHooks;

#[async_trait]
impl ClientHooks for NoopHooks {
    async fn capture_screen(&self, filename: &str) -> VoxlinkResult<String> {
        Ok(format!("Screen capture '{filename}' is not available here."))
    }
    async fn copy_to_clipboard(&self, _text: &str) -> VoxlinkResult<()> {
        Ok(())
    }
    async fn scan_visual_codes(&self) -> VoxlinkResult<Vec<String>> {
        Ok(Vec::new())
    }
    async fn deliver_coaching_tip(&self, _tip: &str) {}
    async fn refresh_wallet(&self) {}
}

/// The execution-context snapshot a handler receives.
///
/// Built by the session engine per dispatch; handlers never reach back
/// into the engine.
#[derive(Clone)]
pub struct ToolContext {
    /// The currently loaded document, if any.
    pub document: Option<DocumentData>,
    /// Root of the mounted project directory, if one is open.
    pub project_dir: Option<PathBuf>,
    /// GitHub credentials, if configured.
    pub github: Option<GithubConfig>,
    /// Status flags at dispatch time.
    pub status: SystemStatus,
    /// Client-side effect hooks.
    pub hooks: Arc<dyn ClientHooks>,
}

impl ToolContext {
    /// A context with the given status and no document/project/creds.
    pub fn new(status: SystemStatus) -> Self {
        Self {
            document: None,
            project_dir: None,
            github: None,
            status,
            hooks: Arc::new(NoopHooks),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(SystemStatus::default())
    }
}
