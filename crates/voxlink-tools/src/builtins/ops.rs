use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use tracing::info;
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Stock lookup against the demo inventory backend.
pub struct CheckInventoryTool {
    descriptor: ToolDescriptor,
}

impl CheckInventoryTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "check_inventory".to_string(),
                agent: AgentKind::Navigator,
                description: "Look up stock levels for a product SKU.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "sku": {
                            "type": "string",
                            "description": "Product SKU, e.g. GEM-001"
                        }
                    },
                    "required": ["sku"]
                }),
            },
        }
    }
}

impl Default for CheckInventoryTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CheckInventoryTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::CheckInventory { sku } = args else {
            return Err(VoxlinkError::Tool("expected check_inventory arguments".into()));
        };
        info!(sku = %sku, "inventory lookup");
        let (status, stock) = if sku == "GEM-001" {
            ("In Stock", 152)
        } else {
            ("Out of Stock", 0)
        };
        Ok(serde_json::json!({"status": status, "stock": stock}).to_string())
    }
}

/// Raises an operator alert. The downstream alerting pipe is the host
/// application's concern; here we acknowledge and log.
pub struct GenerateAlertTool {
    descriptor: ToolDescriptor,
}

impl GenerateAlertTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "generate_alert".to_string(),
                agent: AgentKind::Navigator,
                description: "Create a prioritized operator alert.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "alert_summary": {
                            "type": "string",
                            "description": "One-line description of the situation"
                        },
                        "alert_level": {
                            "type": "string",
                            "description": "Priority, e.g. low/medium/high"
                        }
                    },
                    "required": ["alert_summary", "alert_level"]
                }),
            },
        }
    }
}

impl Default for GenerateAlertTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for GenerateAlertTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::GenerateAlert { summary, level } = args else {
            return Err(VoxlinkError::Tool("expected generate_alert arguments".into()));
        };
        info!(level = %level, summary = %summary, "alert generated");
        Ok(format!(
            "Successfully created a {level} priority alert: \"{summary}\""
        ))
    }
}

/// Acknowledges a meeting request. Calendar integration lives in the
/// host application; the model only needs a confirmation.
pub struct ScheduleMeetingTool {
    descriptor: ToolDescriptor,
}

impl ScheduleMeetingTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "schedule_meeting".to_string(),
                agent: AgentKind::Secretary,
                description: "Schedule a meeting on the user's calendar.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Meeting title"
                        },
                        "time": {
                            "type": "string",
                            "description": "Requested time, free-form"
                        }
                    },
                    "required": ["title", "time"]
                }),
            },
        }
    }
}

impl Default for ScheduleMeetingTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ScheduleMeetingTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::ScheduleMeeting { title, time } = args else {
            return Err(VoxlinkError::Tool("expected schedule_meeting arguments".into()));
        };
        info!(title = %title, time = %time, "meeting scheduled");
        Ok(format!("Meeting \"{title}\" has been scheduled for {time}."))
    }
}

/// Routed half of chart generation. The session engine renders the
/// chart into the transcript before dispatch; the model still expects a
/// textual confirmation in the tool response.
pub struct GenerateChartTool {
    descriptor: ToolDescriptor,
}

impl GenerateChartTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "generate_chart".to_string(),
                agent: AgentKind::Trader,
                description: "Render a bar, line or pie chart for the user.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Chart title"
                        },
                        "type": {
                            "type": "string",
                            "enum": ["bar", "line", "pie"],
                            "description": "Chart kind"
                        },
                        "data": {
                            "type": "array",
                            "description": "Points as {label, value} objects",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "label": {"type": "string"},
                                    "value": {"type": "number"}
                                },
                                "required": ["label", "value"]
                            }
                        }
                    },
                    "required": ["title", "type", "data"]
                }),
            },
        }
    }
}

impl Default for GenerateChartTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for GenerateChartTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::GenerateChart { chart } = args else {
            return Err(VoxlinkError::Tool("expected generate_chart arguments".into()));
        };
        Ok(format!(
            "Chart \"{}\" generated successfully for the user.",
            chart.title
        ))
    }
}
