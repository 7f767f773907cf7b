//! File-based conversation store: one JSON-lines log per session.
//!
//! Storage location: `~/.folio/sessions/<session>.jsonl`. Each line is a
//! JSON-encoded [`Turn`]; appends never rewrite earlier lines, so a log is
//! human-inspectable and survives partial writes (a torn trailing line is
//! skipped on load).

use async_trait::async_trait;
use folio_core::error::MemoryError;
use folio_core::memory::{ConversationStore, SessionId, Turn};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct FileConversationStore {
    dir: PathBuf,
    // appends are serialized; loads may run concurrently
    lock: RwLock<()>,
}

impl FileConversationStore {
    /// The directory is created lazily on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file path for a session. Characters outside `[A-Za-z0-9_-]` are
    /// percent-encoded so distinct ids never share a file.
    fn session_path(&self, session: &SessionId) -> PathBuf {
        let mut name = String::with_capacity(session.as_str().len() + 6);
        for b in session.as_str().bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{b:02X}"));
            }
        }
        name.push_str(".jsonl");
        self.dir.join(name)
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, session: &SessionId, turn: Turn) -> Result<(), MemoryError> {
        let mut line = serde_json::to_string(&turn)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize turn: {e}")))?;
        line.push('\n');

        let _guard = self.lock.write().await;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to create session directory: {e}"))
        })?;

        let path = self.session_path(session);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open session log: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to append turn: {e}")))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to flush session log: {e}")))?;

        debug!(session = %session, path = %path.display(), "Appended turn");
        Ok(())
    }

    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError> {
        let _guard = self.lock.read().await;
        let path = self.session_path(session);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MemoryError::QueryFailed(format!(
                    "Failed to read session log: {e}"
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Turn>(line) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!(session = %session, error = %e, "Skipping corrupted turn");
                    None
                }
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), MemoryError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MemoryError::Storage(format!(
                "Session directory {} unavailable: {e}",
                self.dir.display()
            ))
        })
    }
}
