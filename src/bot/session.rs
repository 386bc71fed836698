// Persisted long-polling offset, so a restart does not replay handled updates

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct SessionFile {
    offset: i64,
    saved_at: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved offset. A missing file is not an error; a corrupt one is.
    pub async fn load(&self) -> Result<Option<i64>> {
        let raw: Vec<u8> = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read session {}", self.path.display()))
            }
        };

        let session: SessionFile = serde_json::from_slice(&raw)
            .with_context(|| format!("Corrupt session file {}", self.path.display()))?;

        Ok(Some(session.offset))
    }

    /// Writes the offset through a sibling temp file so readers never see half a file
    pub async fn save(&self, offset: i64) -> Result<()> {
        let session: SessionFile = SessionFile {
            offset,
            saved_at: Utc::now().to_rfc3339(),
        };
        let body: Vec<u8> = serde_json::to_vec(&session)?;

        let tmp: PathBuf = self.path.with_extension("session.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write session {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace session {}", self.path.display()))?;

        debug!(offset, "Session saved");
        Ok(())
    }

    /// Deletes the session file; a missing file counts as cleared
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete session {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: SessionStore = SessionStore::new(dir.path().join("bot.session"));

        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn saved_offset_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store: SessionStore = SessionStore::new(dir.path().join("bot.session"));

        store.save(1234).await.unwrap();
        store.save(1240).await.unwrap();

        let reopened: SessionStore = SessionStore::new(store.path().to_path_buf());
        assert_eq!(reopened.load().await.unwrap(), Some(1240));

        reopened.clear().await.unwrap();
        assert!(!reopened.path().exists());
    }

    #[tokio::test]
    async fn corrupt_session_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("bot.session");
        std::fs::write(&path, b"not json").unwrap();

        let err = SessionStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("Corrupt session"));
    }
}
