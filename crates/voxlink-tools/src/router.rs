use crate::args::ToolArgs;
use crate::audit::{AuditEntry, AuditOutcome, AuditSink};
use crate::context::ToolContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use voxlink_core::{ToolCall, ToolResult, VoxlinkResult};

/// The micro-agent a tool belongs to, used as the audit label and in
/// the declared catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentKind {
    /// Market data and visualization.
    Trader,
    /// Project file system and code.
    Engineer,
    /// Location, alerts, logistics.
    Navigator,
    /// Documents and research.
    Analyst,
    /// Scheduling and client-device actions.
    Secretary,
    /// Session-internal behavior.
    System,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Trader => "TRADER",
            Self::Engineer => "ENGINEER",
            Self::Navigator => "NAVIGATOR",
            Self::Analyst => "ANALYST",
            Self::Secretary => "SECRETARY",
            Self::System => "SYSTEM",
        };
        f.write_str(label)
    }
}

/// Metadata describing a tool's interface, declared to the remote
/// service at session open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name the model calls.
    pub name: String,
    /// Owning agent.
    pub agent: AgentKind,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON schema of the argument map.
    pub parameters_schema: serde_json::Value,
}

/// Trait all routed tool handlers implement.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The handler's declared interface.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute with validated arguments. Errors returned here are
    /// converted into error-shaped results by the router; they never
    /// reach the session stream as failures.
    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String>;
}

/// Name-to-handler registry, built once at startup and looked up at
/// dispatch time. Adding a tool is a data change, not a control-flow
/// change.
pub struct ToolRouter {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    audit: Arc<dyn AuditSink>,
}

impl ToolRouter {
    /// Creates an empty router recording to the given audit sink.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            handlers: HashMap::new(),
            audit,
        }
    }

    /// Registers a handler under its declared name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.descriptor().name.clone();
        info!(tool = %name, agent = %handler.descriptor().agent, "registered tool");
        self.handlers.insert(name, handler);
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// The declared tool catalog sent in the session-open configuration.
    pub fn declarations(&self) -> Vec<serde_json::Value> {
        let mut decls: Vec<_> = self
            .handlers
            .values()
            .map(|h| {
                let d = h.descriptor();
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "parameters": d.parameters_schema,
                })
            })
            .collect();
        decls.sort_by_key(|d| d["name"].as_str().map(str::to_owned));
        decls
    }

    /// Dispatches one call: validate arguments, look up the handler,
    /// run it, and convert any failure into an error-shaped result.
    ///
    /// Exactly one [`ToolResult`] comes back for every call, and every
    /// dispatch — success or failure — lands in the audit trail.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let args = match ToolArgs::parse(&call.name, &call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool arguments rejected");
                let result = ToolResult::error(&call.id, e.to_string());
                self.audit.record(AuditEntry::new(
                    AgentKind::System.to_string(),
                    &call.name,
                    AuditOutcome::Error,
                    &result.content,
                ));
                return result;
            }
        };

        let Some(handler) = self.handlers.get(&call.name) else {
            let message = format!("no handler registered for tool '{}'", call.name);
            warn!(tool = %call.name, "unroutable tool call");
            self.audit.record(AuditEntry::new(
                AgentKind::System.to_string(),
                &call.name,
                AuditOutcome::Error,
                &message,
            ));
            return ToolResult::error(&call.id, message);
        };

        let agent = handler.descriptor().agent;
        match handler.run(args, ctx).await {
            Ok(content) => {
                self.audit.record(AuditEntry::new(
                    agent.to_string(),
                    &call.name,
                    AuditOutcome::Success,
                    &content,
                ));
                ToolResult::success(&call.id, content)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed");
                let message = format!("Tool '{}' failed: {e}", call.name);
                self.audit.record(AuditEntry::new(
                    agent.to_string(),
                    &call.name,
                    AuditOutcome::Error,
                    &message,
                ));
                ToolResult::error(&call.id, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditTrail;
    use serde_json::json;
    use voxlink_core::VoxlinkError;

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor {
                    name: "search_web".to_string(),
                    agent: AgentKind::Analyst,
                    description: "echo for tests".to_string(),
                    parameters_schema: json!({"type": "object"}),
                },
            }
        }
    }

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }
        async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
            match args {
                ToolArgs::SearchWeb { query } => Ok(format!("echo: {query}")),
                other => Err(VoxlinkError::Tool(format!("unexpected args {other:?}"))),
            }
        }
    }

    struct ExplodingTool {
        descriptor: ToolDescriptor,
    }

    impl ExplodingTool {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor {
                    name: "check_inventory".to_string(),
                    agent: AgentKind::Navigator,
                    description: "always fails".to_string(),
                    parameters_schema: json!({"type": "object"}),
                },
            }
        }
    }

    #[async_trait]
    impl ToolHandler for ExplodingTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }
        async fn run(&self, _args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
            Err(VoxlinkError::Tool("backend unreachable".to_string()))
        }
    }

    fn router_with(trail: Arc<MemoryAuditTrail>) -> ToolRouter {
        let mut router = ToolRouter::new(trail);
        router.register(Arc::new(EchoTool::new()));
        router.register(Arc::new(ExplodingTool::new()));
        router
    }

    #[tokio::test]
    async fn successful_dispatch_is_correlated_and_audited() {
        let trail = Arc::new(MemoryAuditTrail::new());
        let router = router_with(trail.clone());

        let call = ToolCall {
            id: "call-7".to_string(),
            name: "search_web".to_string(),
            arguments: json!({"query": "ferris"}),
        };
        let result = router.dispatch(&call, &ToolContext::default()).await;
        assert_eq!(result.call_id, "call-7");
        assert!(!result.is_error);
        assert_eq!(result.content, "echo: ferris");

        let entries = trail.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].agent, "ANALYST");
        assert_eq!(entries[0].outcome, AuditOutcome::Success);
    }

    #[tokio::test]
    async fn handler_failure_becomes_error_result_not_error() {
        let trail = Arc::new(MemoryAuditTrail::new());
        let router = router_with(trail.clone());

        let call = ToolCall {
            id: "call-8".to_string(),
            name: "check_inventory".to_string(),
            arguments: json!({"sku": "GEM-001"}),
        };
        let result = router.dispatch(&call, &ToolContext::default()).await;
        assert_eq!(result.call_id, "call-8");
        assert!(result.is_error);
        assert!(result.content.contains("backend unreachable"));
        assert_eq!(trail.snapshot()[0].outcome, AuditOutcome::Error);
    }

    #[tokio::test]
    async fn invalid_arguments_and_unknown_tools_still_get_results() {
        let trail = Arc::new(MemoryAuditTrail::new());
        let router = router_with(trail.clone());

        let bad_args = ToolCall {
            id: "c1".to_string(),
            name: "search_web".to_string(),
            arguments: json!({}),
        };
        let result = router.dispatch(&bad_args, &ToolContext::default()).await;
        assert!(result.is_error);
        assert_eq!(result.call_id, "c1");

        let unknown = ToolCall {
            id: "c2".to_string(),
            name: "generate_alert".to_string(),
            arguments: json!({"alert_summary": "s", "alert_level": "high"}),
        };
        let result = router.dispatch(&unknown, &ToolContext::default()).await;
        assert!(result.is_error);
        assert!(result.content.contains("no handler registered"));

        // One audit entry per dispatch, regardless of path.
        assert_eq!(trail.snapshot().len(), 2);
    }

    #[test]
    fn declarations_are_sorted_and_complete() {
        let router = router_with(Arc::new(MemoryAuditTrail::new()));
        let decls = router.declarations();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0]["name"], "check_inventory");
        assert_eq!(decls[1]["name"], "search_web");
    }
}
