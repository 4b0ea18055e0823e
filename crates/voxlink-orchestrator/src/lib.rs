//! Application-facing facade over the session engine.
//!
//! The engine knows nothing about persistence or long-lived memory; this
//! crate binds it to both. An [`Orchestrator`] starts and stops sessions,
//! prepends finished transcripts to the conversation history, runs the
//! semantic-memory summarizer after each saved session, and offers to
//! resume a transcript left behind by an unexpected drop.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};
use voxlink_core::{ConversationSession, SemanticMemory, TranscriptTurn, VoxlinkResult};
use voxlink_session::{HistoryStore, SessionConfig, SessionEngine, SnapshotStore};

/// Distills a finished session into long-lived memory.
///
/// Summarization quality (and whatever model it runs on) is an external
/// concern; the orchestrator only requires that failures stay behind
/// this boundary.
#[async_trait]
pub trait MemorySummarizer: Send + Sync {
    /// Produce the next memory state from a finished session and the
    /// memory accumulated so far.
    async fn summarize(
        &self,
        session: &ConversationSession,
        previous: Option<&SemanticMemory>,
    ) -> VoxlinkResult<SemanticMemory>;
}

/// Summarizer that keeps memory exactly as it was. The default until a
/// host wires in a real one.
pub struct NoopSummarizer;

#[async_trait]
impl MemorySummarizer for NoopSummarizer {
    async fn summarize(
        &self,
        _session: &ConversationSession,
        previous: Option<&SemanticMemory>,
    ) -> VoxlinkResult<SemanticMemory> {
        Ok(previous.cloned().unwrap_or_default())
    }
}

/// Binds one [`SessionEngine`] to application state.
pub struct Orchestrator {
    engine: Arc<SessionEngine>,
    history: Arc<dyn HistoryStore>,
    snapshots: Arc<dyn SnapshotStore>,
    summarizer: Arc<dyn MemorySummarizer>,
    memory: Mutex<Option<SemanticMemory>>,
}

impl Orchestrator {
    /// Creates a facade over an already-wired engine.
    pub fn new(
        engine: Arc<SessionEngine>,
        history: Arc<dyn HistoryStore>,
        snapshots: Arc<dyn SnapshotStore>,
        summarizer: Arc<dyn MemorySummarizer>,
    ) -> Self {
        Self {
            engine,
            history,
            snapshots,
            summarizer,
            memory: Mutex::new(None),
        }
    }

    /// The engine this facade drives.
    pub fn engine(&self) -> &Arc<SessionEngine> {
        &self.engine
    }

    /// The semantic memory accumulated across saved sessions.
    pub fn memory(&self) -> Option<SemanticMemory> {
        self.memory.lock().clone()
    }

    /// Seeds memory loaded from wherever the host persists it.
    pub fn set_memory(&self, memory: Option<SemanticMemory>) {
        *self.memory.lock() = memory;
    }

    /// The transcript an unexpectedly dropped session left behind, if
    /// one exists. Present the offer, then pass the turns to
    /// [`Orchestrator::start`] via `resumed_turns` — or ignore it and a
    /// normal start will clear it.
    pub async fn resume_offer(&self) -> VoxlinkResult<Option<Vec<TranscriptTurn>>> {
        self.snapshots.load().await
    }

    /// Starts a session, injecting the accumulated semantic memory into
    /// the configuration.
    pub async fn start(&self, mut config: SessionConfig) -> VoxlinkResult<()> {
        if config.semantic_memory.is_none() {
            config.semantic_memory = self.memory.lock().clone();
        }
        self.engine.start(config).await
    }

    /// Stops the session. When `save` is set and the session produced
    /// turns, the record is prepended to history and run through the
    /// summarizer; a summarizer failure loses nothing but the memory
    /// update.
    pub async fn stop(&self, save: bool) -> VoxlinkResult<Option<ConversationSession>> {
        let Some(record) = self.engine.stop(save).await? else {
            return Ok(None);
        };

        self.history.prepend(&record).await?;
        info!(session = %record.id, turns = record.turns.len(), "session saved to history");

        let previous = self.memory.lock().clone();
        match self.summarizer.summarize(&record, previous.as_ref()).await {
            Ok(memory) => *self.memory.lock() = Some(memory),
            Err(e) => warn!(error = %e, "semantic memory summarization failed"),
        }

        Ok(Some(record))
    }

    /// Sends free-text input to the live session.
    pub async fn send_text(&self, message: &str) -> VoxlinkResult<()> {
        self.engine.send_text(message).await
    }

    /// Adjusts playback volume.
    pub fn set_volume(&self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Toggles camera/display substitution on the live session.
    pub async fn toggle_screen_share(&self) -> VoxlinkResult<bool> {
        self.engine.toggle_screen_share().await
    }

    /// The full saved conversation history, newest first.
    pub async fn history(&self) -> VoxlinkResult<Vec<ConversationSession>> {
        self.history.load().await
    }
}
