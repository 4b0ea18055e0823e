use async_trait::async_trait;
use std::path::PathBuf;
use voxlink_core::{ConversationSession, TranscriptTurn, VoxlinkError, VoxlinkResult};

/// Persisted conversation history, newest record first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The full ordered history.
    async fn load(&self) -> VoxlinkResult<Vec<ConversationSession>>;
    /// Prepend a finished session. Records are immutable once stored.
    async fn prepend(&self, session: &ConversationSession) -> VoxlinkResult<()>;
    /// Remove everything.
    async fn clear(&self) -> VoxlinkResult<()>;
}

/// Ephemeral snapshot of an in-flight transcript, used only to offer
/// "resume" after an unexpected drop. Cleared on every clean stop.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Overwrite the snapshot with the current transcript.
    async fn save(&self, turns: &[TranscriptTurn]) -> VoxlinkResult<()>;
    /// The interrupted transcript, if one was left behind.
    async fn load(&self) -> VoxlinkResult<Option<Vec<TranscriptTurn>>>;
    /// Discard the snapshot.
    async fn clear(&self) -> VoxlinkResult<()>;
}

/// History as one JSON file on disk.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    /// Creates a store writing to `dir/history.json`.
    pub async fn new(dir: PathBuf) -> VoxlinkResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            path: dir.join("history.json"),
        })
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self) -> VoxlinkResult<Vec<ConversationSession>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&data)
            .map_err(|e| VoxlinkError::Session(format!("failed to parse history: {e}")))
    }

    async fn prepend(&self, session: &ConversationSession) -> VoxlinkResult<()> {
        let mut history = self.load().await?;
        history.insert(0, session.clone());
        let json = serde_json::to_string_pretty(&history)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn clear(&self) -> VoxlinkResult<()> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

/// Interrupted-session snapshot as one JSON file on disk.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store writing to `dir/interrupted.json`.
    pub async fn new(dir: PathBuf) -> VoxlinkResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            path: dir.join("interrupted.json"),
        })
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, turns: &[TranscriptTurn]) -> VoxlinkResult<()> {
        let json = serde_json::to_string(turns)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn load(&self) -> VoxlinkResult<Option<Vec<TranscriptTurn>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        let turns: Vec<TranscriptTurn> = serde_json::from_str(&data)
            .map_err(|e| VoxlinkError::Session(format!("failed to parse snapshot: {e}")))?;
        Ok((!turns.is_empty()).then_some(turns))
    }

    async fn clear(&self) -> VoxlinkResult<()> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
