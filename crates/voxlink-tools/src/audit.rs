use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

/// Result bits kept in the trail are clipped to this length.
const SUMMARY_LIMIT: usize = 160;

/// Outcome classification for an audited dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// The handler produced a result.
    Success,
    /// The handler failed (or the arguments were invalid).
    Error,
}

/// One audited tool dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// When the dispatch finished.
    pub timestamp: DateTime<Utc>,
    /// Owning agent label (e.g. `TRADER`).
    pub agent: String,
    /// Tool/action name.
    pub action: String,
    /// Success or error.
    pub outcome: AuditOutcome,
    /// Truncated result or error text.
    pub summary: String,
}

impl AuditEntry {
    /// Builds an entry, clipping the summary.
    pub fn new(
        agent: impl Into<String>,
        action: impl Into<String>,
        outcome: AuditOutcome,
        summary: &str,
    ) -> Self {
        let mut summary = summary.to_string();
        if summary.chars().count() > SUMMARY_LIMIT {
            summary = summary.chars().take(SUMMARY_LIMIT).collect();
            summary.push('…');
        }
        Self {
            timestamp: Utc::now(),
            agent: agent.into(),
            action: action.into(),
            outcome,
            summary,
        }
    }
}

/// Destination for audit entries. Recording must never block dispatch.
pub trait AuditSink: Send + Sync {
    /// Record one entry.
    fn record(&self, entry: AuditEntry);
}

/// In-memory trail, mostly for tests and short-lived sessions.
#[derive(Default)]
pub struct MemoryAuditTrail {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything recorded so far.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }
}

impl AuditSink for MemoryAuditTrail {
    fn record(&self, entry: AuditEntry) {
        self.entries.write().push(entry);
    }
}

/// Append-only JSONL trail on disk. A background task does the writing
/// so dispatch never waits on the filesystem.
pub struct FileAuditTrail {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl FileAuditTrail {
    /// Creates the trail and spawns its writer task.
    pub fn new(log_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();

        tokio::spawn(async move {
            let _ = tokio::fs::create_dir_all(&log_dir).await;
            let log_file = log_dir.join("audit.jsonl");

            while let Some(entry) = rx.recv().await {
                if let Ok(mut line) = serde_json::to_string(&entry) {
                    line.push('\n');
                    let open = tokio::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&log_file)
                        .await;
                    if let Ok(mut file) = open {
                        use tokio::io::AsyncWriteExt;
                        let _ = file.write_all(line.as_bytes()).await;
                    }
                }
            }
        });

        Self { tx }
    }
}

impl AuditSink for FileAuditTrail {
    fn record(&self, entry: AuditEntry) {
        info!(
            agent = %entry.agent,
            action = %entry.action,
            outcome = ?entry.outcome,
            "audit"
        );
        let _ = self.tx.send(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_truncated() {
        let long = "x".repeat(400);
        let entry = AuditEntry::new("SYSTEM", "search_web", AuditOutcome::Success, &long);
        assert!(entry.summary.chars().count() <= SUMMARY_LIMIT + 1);
        assert!(entry.summary.ends_with('…'));
    }

    #[test]
    fn memory_trail_records_in_order() {
        let trail = MemoryAuditTrail::new();
        trail.record(AuditEntry::new("A", "first", AuditOutcome::Success, "ok"));
        trail.record(AuditEntry::new("B", "second", AuditOutcome::Error, "bad"));
        let entries = trail.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "first");
        assert_eq!(entries[1].outcome, AuditOutcome::Error);
    }
}
