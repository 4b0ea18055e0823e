use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Captures the screen through the client hook.
pub struct CaptureScreenTool {
    descriptor: ToolDescriptor,
}

impl CaptureScreenTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "capture_screen".to_string(),
                agent: AgentKind::Secretary,
                description: "Capture the current screen to an image file.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "filename": {
                            "type": "string",
                            "description": "Name for the saved capture"
                        }
                    },
                    "required": ["filename"]
                }),
            },
        }
    }
}

impl Default for CaptureScreenTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CaptureScreenTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::CaptureScreen { filename } = args else {
            return Err(VoxlinkError::Tool("expected capture_screen arguments".into()));
        };
        ctx.hooks.capture_screen(&filename).await
    }
}

/// Writes text to the client clipboard.
pub struct CopyToClipboardTool {
    descriptor: ToolDescriptor,
}

impl CopyToClipboardTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "copy_to_clipboard".to_string(),
                agent: AgentKind::Secretary,
                description: "Copy text to the user's clipboard.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to copy"
                        }
                    },
                    "required": ["text"]
                }),
            },
        }
    }
}

impl Default for CopyToClipboardTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CopyToClipboardTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::CopyToClipboard { text } = args else {
            return Err(VoxlinkError::Tool("expected copy_to_clipboard arguments".into()));
        };
        ctx.hooks.copy_to_clipboard(&text).await?;
        Ok("Copied to the clipboard.".to_string())
    }
}

/// Scans the camera view for QR and barcodes. Requires a live camera
/// track in the session.
pub struct ScanVisualCodesTool {
    descriptor: ToolDescriptor,
}

impl ScanVisualCodesTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "scan_visual_codes".to_string(),
                agent: AgentKind::Secretary,
                description: "Scan the camera view for QR codes and barcodes.".to_string(),
                parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
            },
        }
    }
}

impl Default for ScanVisualCodesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ScanVisualCodesTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::ScanVisualCodes = args else {
            return Err(VoxlinkError::Tool("expected scan_visual_codes arguments".into()));
        };
        if !ctx.status.vision_enabled {
            return Ok(
                "The camera is not active, so I can't scan for codes right now.".to_string(),
            );
        }
        let codes = ctx.hooks.scan_visual_codes().await?;
        if codes.is_empty() {
            Ok("No QR codes or barcodes are visible.".to_string())
        } else {
            Ok(format!("Found {} code(s): {}", codes.len(), codes.join(", ")))
        }
    }
}

/// Delivers a coaching tip to the user. Only meaningful while coaching
/// mode is on.
pub struct OfferCoachingTipTool {
    descriptor: ToolDescriptor,
}

impl OfferCoachingTipTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "offer_coaching_tip".to_string(),
                agent: AgentKind::Secretary,
                description: "Show the user a short, actionable coaching tip.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "tip": {
                            "type": "string",
                            "description": "The tip text"
                        }
                    },
                    "required": ["tip"]
                }),
            },
        }
    }
}

impl Default for OfferCoachingTipTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for OfferCoachingTipTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::OfferCoachingTip { tip } = args else {
            return Err(VoxlinkError::Tool("expected offer_coaching_tip arguments".into()));
        };
        if !ctx.status.coaching_mode {
            return Ok("Coaching mode is off; the tip was not shown.".to_string());
        }
        ctx.hooks.deliver_coaching_tip(&tip).await;
        Ok("Tip delivered.".to_string())
    }
}

/// Tells the client its wallet view is stale and should refetch.
pub struct RefreshWalletTool {
    descriptor: ToolDescriptor,
}

impl RefreshWalletTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "refresh_wallet".to_string(),
                agent: AgentKind::Trader,
                description: "Refresh the user's wallet balances.".to_string(),
                parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
            },
        }
    }
}

impl Default for RefreshWalletTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for RefreshWalletTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::RefreshWallet = args else {
            return Err(VoxlinkError::Tool("expected refresh_wallet arguments".into()));
        };
        ctx.hooks.refresh_wallet().await;
        Ok("Wallet refresh requested.".to_string())
    }
}
