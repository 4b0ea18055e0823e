use std::path::PathBuf;
use voxlink_core::{DocumentData, SemanticMemory, TranscriptTurn};
use voxlink_media::NetworkQuality;
use voxlink_tools::GithubConfig;

/// Everything a `start()` call needs to open one session.
///
/// Recomputed state (stream profile, system instruction) is derived from
/// this once per start, never mid-session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prebuilt voice for synthesized speech.
    pub voice: String,
    /// Language the user speaks.
    pub source_language: String,
    /// Language responses should arrive in.
    pub target_language: String,
    /// Whether to capture and stream camera frames.
    pub vision_enabled: bool,
    /// Initial playback gain, `0.0..=1.0`.
    pub volume: f32,
    /// Network classification measured at start.
    pub network: NetworkQuality,
    /// Whether the host believes it is online. Starting offline fails
    /// fast without touching any device.
    pub is_online: bool,
    /// Visual description of the authorized user; registering one locks
    /// the session until the biometric tool confirms a match.
    pub face_reference: Option<String>,
    /// Long-lived memory injected into the system instruction.
    pub semantic_memory: Option<SemanticMemory>,
    /// Transcript of an interrupted session to resume from.
    pub resumed_turns: Vec<TranscriptTurn>,
    /// Document available to the RAG tool.
    pub document: Option<DocumentData>,
    /// Mounted project directory for the file tools.
    pub project_dir: Option<PathBuf>,
    /// Credentials for repository-backed tools.
    pub github: Option<GithubConfig>,
    /// Whether coaching-tip delivery is enabled.
    pub coaching_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            voice: "Kore".to_string(),
            source_language: "en".to_string(),
            target_language: "en".to_string(),
            vision_enabled: false,
            volume: 1.0,
            network: NetworkQuality::Optimal,
            is_online: true,
            face_reference: None,
            semantic_memory: None,
            resumed_turns: Vec::new(),
            document: None,
            project_dir: None,
            github: None,
            coaching_mode: false,
        }
    }
}
