use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The shape of a chart injected into the transcript by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Vertical bars, one per data point.
    Bar,
    /// A single connected line.
    Line,
    /// Proportional slices.
    Pie,
}

/// One labelled data point within a chart payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Axis or slice label.
    pub label: String,
    /// Numeric value.
    pub value: f64,
}

/// A structured visualization attached to a transcript turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    /// Chart title shown to the user.
    pub title: String,
    /// Visualization type.
    pub kind: ChartKind,
    /// Ordered data points.
    pub points: Vec<ChartPoint>,
}

/// One logical user-then-assistant exchange unit in the transcript.
///
/// Turns are accumulated from streaming partial-transcript events and
/// finalized when the server signals turn completion. A turn with both
/// text fields empty and no chart payload is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    /// Unique identifier for this turn.
    pub id: Uuid,
    /// Accumulated user utterance text (possibly empty).
    pub user: String,
    /// Accumulated assistant utterance text (possibly empty).
    pub assistant: String,
    /// Detected-emotion label set via the emotion-display tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Structured chart attached via the chart-generation tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartPayload>,
    /// Whether the turn was injected by the model rather than spoken.
    #[serde(default)]
    pub autonomous: bool,
}

impl TranscriptTurn {
    /// Creates a plain text turn.
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            assistant: assistant.into(),
            emotion: None,
            chart: None,
            autonomous: false,
        }
    }

    /// Creates an autonomous chart-only turn.
    pub fn chart(chart: ChartPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: String::new(),
            assistant: String::new(),
            emotion: None,
            chart: Some(chart),
            autonomous: true,
        }
    }

    /// Whether this turn carries nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.assistant.is_empty() && self.chart.is_none()
    }
}

/// An immutable record of a completed live session.
///
/// Created when a live session stops with turns recorded, then prepended
/// to the persisted history list. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Unique identifier for this record.
    pub id: Uuid,
    /// UTC timestamp of when the session ended.
    pub timestamp: DateTime<Utc>,
    /// Ordered turns as they were exchanged.
    pub turns: Vec<TranscriptTurn>,
}

impl ConversationSession {
    /// Wraps a finished transcript into a history record stamped "now".
    pub fn from_turns(turns: Vec<TranscriptTurn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            turns,
        }
    }
}
