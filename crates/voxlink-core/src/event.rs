use crate::status::SecurityStatus;
use crate::turn::TranscriptTurn;
use serde::{Deserialize, Serialize};

/// UI-visible events emitted by the session engine.
///
/// The orchestration layer forwards these to application state; the
/// engine itself never renders anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A connection attempt has begun.
    Connecting,
    /// The session reached the open state.
    Started,
    /// The session returned to idle.
    Stopped,
    /// A session-threatening error was surfaced; the engine is idle again.
    Error { message: String },
    /// The accumulated user transcript for the current turn changed.
    UserTranscript { text: String },
    /// The accumulated assistant transcript for the current turn changed.
    AssistantTranscript { text: String },
    /// A turn was finalized and appended to the transcript.
    TurnCommitted { turn: TranscriptTurn },
    /// The detected-emotion label changed.
    Emotion { label: Option<String> },
    /// A tool call is in flight; render a pending indicator.
    ToolCallPending {
        name: String,
        arguments: serde_json::Value,
    },
    /// Grounding metadata arrived for the current response.
    Grounding { chunks: serde_json::Value },
    /// The security gate flipped.
    SecurityChanged { status: SecurityStatus },
    /// Screen sharing started or stopped.
    ScreenShare { active: bool },
    /// A user preference was saved to semantic memory.
    MemoryUpdated { preference: String },
}
