use serde::{Deserialize, Serialize};
use serde_json::Value;
use voxlink_core::ToolCall;
use voxlink_media::MediaChunk;

/// The one-time configuration sent when the session opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    /// Response modalities requested from the model (`["AUDIO"]`).
    pub response_modalities: Vec<String>,
    /// Whether to stream back transcriptions of the user's audio.
    pub input_audio_transcription: bool,
    /// Whether to stream back transcriptions of the model's audio.
    pub output_audio_transcription: bool,
    /// Prebuilt voice name for synthesized speech.
    pub voice: String,
    /// The assembled system instruction text.
    pub system_instruction: String,
    /// Declared tool catalog (name/description/parameters per tool).
    pub tool_declarations: Vec<Value>,
}

/// Messages the client sends over the open session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A realtime media chunk (PCM audio or JPEG frame).
    Realtime { media: MediaChunk },
    /// Free-text user input.
    Text { text: String },
    /// The correlated response to one tool call.
    ToolResponse {
        id: String,
        name: String,
        response: Value,
    },
}

/// Events the server pushes over the open session, already demuxed from
/// the wire envelope by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Partial transcription of the user's audio; applied in arrival order.
    InputTranscription(String),
    /// Partial transcription of the model's audio.
    OutputTranscription(String),
    /// Base64 PCM audio at the output sample rate.
    AudioChunk(String),
    /// A batch of tool invocations, processed in the order given.
    ToolCalls(Vec<ToolCall>),
    /// The user started speaking over the assistant; flush playback.
    Interrupted,
    /// The current exchange is complete; finalize the turn.
    TurnComplete,
    /// Grounding metadata for the current response.
    Grounding(Value),
    /// The connection failed mid-session; carries the reason.
    Failed(String),
    /// The remote side closed the connection.
    Closed,
}
