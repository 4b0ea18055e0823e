use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The access-control state of the live session.
///
/// `Open` means no biometric reference is registered and nothing is
/// gated. `Locked`/`Unlocked` track the result of the biometric
/// confirmation tool. While locked, the session instruction tells the
/// model to restrict itself to verification-only behavior — a trust
/// boundary, not a hard guarantee from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityStatus {
    /// No reference registered; nothing gated.
    Open,
    /// A reference exists and verification has not succeeded yet.
    Locked,
    /// Verification succeeded for this session.
    Unlocked,
}

/// Coarse device-motion classification fed into the tool context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionStatus {
    /// No significant motion detected.
    Stationary,
    /// Walking-pace movement.
    Walking,
    /// Vehicle-speed movement.
    Driving,
}

/// A latitude/longitude pair from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees latitude.
    pub latitude: f64,
    /// Degrees longitude.
    pub longitude: f64,
}

/// A tabular document loaded by the user, queryable by the RAG tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    /// Column headers.
    pub headers: Vec<String>,
    /// Data rows, one cell per header.
    pub rows: Vec<Vec<String>>,
}

/// Long-lived conversational memory distilled from past sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticMemory {
    /// Free-text summary of what the assistant knows about the user.
    pub summary: String,
    /// Named entities worth remembering, as `(name, kind)` pairs.
    pub key_entities: Vec<(String, String)>,
    /// Explicit user preferences, accumulated via the memory tool.
    pub user_preferences: Vec<String>,
}

/// One entry in the session-local mission log, mutated by intercepted
/// mission-log tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionTask {
    /// Unique identifier.
    pub id: Uuid,
    /// Task description.
    pub description: String,
    /// Whether the task has been marked done.
    pub completed: bool,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl MissionTask {
    /// Creates a new, incomplete task.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}
