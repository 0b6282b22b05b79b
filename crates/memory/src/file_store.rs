//! File-based checkpoint store: one JSON document per session.
//!
//! Storage location: `~/.intellicore/checkpoints/<session>.json`
//!
//! Each write goes to a temporary file that is then renamed over the
//! previous checkpoint, so a reader sees either the old or the new snapshot.
//! Writes are serialized per session key; distinct keys write concurrently.
//!
//! Short keys are percent-encoded into the file name. Keys whose encoding
//! would exceed [`MAX_STEM_LEN`] are stored under `~<sha256 hex>.json`; the
//! real key is read back from the envelope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::error::CheckpointError;
use intellicore_core::state::WorkflowState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Longest percent-encoded stem kept verbatim. Leaves room for `.json.tmp`
/// under the common 255-byte file name limit.
pub const MAX_STEM_LEN: usize = 200;

/// Marks a digest stem; never produced by [`encode_key`].
const HASHED_PREFIX: char = '~';

/// On-disk checkpoint envelope.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCheckpoint {
    session_key: String,
    updated_at: DateTime<Utc>,
    state: WorkflowState,
}

/// A directory of JSON checkpoints.
pub struct FileCheckpointStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileCheckpointStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File checkpoint store opened");
        Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(session_key)))
    }

    /// The lock guarding one session's file.
    async fn lock_for(&self, session_key: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(session_key.to_string())
            .or_default()
            .clone()
    }

    /// Forget a session's lock once nobody else holds it.
    async fn release_lock(&self, session_key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(session_key);
        }
    }

    async fn write_checkpoint(
        &self,
        session_key: &str,
        state: &WorkflowState,
    ) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = StoredCheckpoint {
            session_key: session_key.to_string(),
            updated_at: Utc::now(),
            state: state.clone(),
        };
        let body = serde_json::to_vec_pretty(&record)?;

        let path = self.path_for(session_key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(session = %session_key, path = %path.display(), "Checkpoint written");
        Ok(())
    }

    async fn remove_checkpoint(&self, session_key: &str) -> Result<bool, CheckpointError> {
        match tokio::fs::remove_file(self.path_for(session_key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_record(&self, path: &Path) -> Result<StoredCheckpoint, CheckpointError> {
        let body = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn put(&self, session_key: &str, state: &WorkflowState) -> Result<(), CheckpointError> {
        let lock = self.lock_for(session_key).await;
        let result = {
            let _guard = lock.lock().await;
            self.write_checkpoint(session_key, state).await
        };
        self.release_lock(session_key, lock).await;
        result
    }

    async fn get(&self, session_key: &str) -> Result<Option<WorkflowState>, CheckpointError> {
        let path = self.path_for(session_key);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: StoredCheckpoint = serde_json::from_slice(&body)?;
        Ok(Some(record.state))
    }

    async fn delete(&self, session_key: &str) -> Result<bool, CheckpointError> {
        let lock = self.lock_for(session_key).await;
        let result = {
            let _guard = lock.lock().await;
            self.remove_checkpoint(session_key).await
        };
        self.release_lock(session_key, lock).await;
        result
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if stem.starts_with(HASHED_PREFIX) {
                match self.read_record(&entry.path()).await {
                    Ok(record) => sessions.push(record.session_key),
                    Err(e) => warn!(file = %stem, error = %e, "Skipping unreadable checkpoint"),
                }
                continue;
            }
            match decode_key(stem) {
                Some(key) => sessions.push(key),
                None => warn!(file = %stem, "Skipping checkpoint with undecodable name"),
            }
        }
        sessions.sort();
        Ok(sessions)
    }
}

/// The file stem for a session key: its encoding, or a digest when too long.
fn file_stem(key: &str) -> String {
    let encoded = encode_key(key);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }
    format!("{HASHED_PREFIX}{:x}", Sha256::digest(key.as_bytes()))
}

/// Encode a session key into a filesystem-safe stem (`%XX` for unsafe bytes).
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
