use serde::{Deserialize, Serialize};

/// A server-issued request to execute a named tool and return a result.
///
/// Every call the server sends must receive exactly one correlated
/// response, or the remote side may stall waiting for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the remote service for this invocation.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Loosely typed JSON arguments; validated at the dispatch boundary.
    pub arguments: serde_json::Value,
}

/// The result of executing a [`ToolCall`].
///
/// Tool execution failures never cross the dispatch boundary as errors;
/// they are converted into an error-shaped result so the remote model can
/// react conversationally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The ID of the [`ToolCall`] this result corresponds to.
    pub call_id: String,
    /// Textual output produced by the tool (or the error description).
    pub content: String,
    /// Whether the execution ended in an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful tool result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error tool result.
    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// The response payload sent back over the live session.
    ///
    /// Successful results become `{"result": ...}`; failures become
    /// `{"error": ...}` so the model can distinguish them.
    pub fn response_body(&self) -> serde_json::Value {
        if self.is_error {
            serde_json::json!({ "error": self.content })
        } else {
            serde_json::json!({ "result": self.content })
        }
    }
}
