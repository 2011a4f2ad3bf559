use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{error::Result, models::session::SessionDocument};

/// Reads and writes the session document as a single JSON file.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    path: PathBuf,
}

impl SessionRepository {
    /// Creates a new `SessionRepository` backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the latest durable snapshot.
    ///
    /// # Returns
    ///
    /// The stored document, or an empty one if the file does not exist yet.
    pub async fn load(&self) -> Result<SessionDocument> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No session document at {}, starting empty", self.path.display());
                return Ok(SessionDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        let document: SessionDocument = sonic_rs::from_slice(&bytes)?;
        Ok(document)
    }

    /// Replaces the stored document with `document`.
    ///
    /// The bytes are written to a sibling file first and renamed over the
    /// target, so a reader sees either the old or the new document.
    pub async fn save(&self, document: &SessionDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = sonic_rs::to_string_pretty(document)?;
        let staging = self.staging_path();

        fs::write(&staging, json.as_bytes()).await?;
        fs::rename(&staging, &self.path).await?;

        tracing::debug!(
            "Persisted {} sessions to {}",
            document.sessions.len(),
            self.path.display()
        );
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{NewSession, SessionRecord};
    use chrono::Utc;

    #[tokio::test]
    async fn missing_file_loads_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path().join("sessions.json"));

        let document = repo.load().await.unwrap();

        assert_eq!(document, SessionDocument::default());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path().join("nested").join("sessions.json"));

        let mut document = SessionDocument::default();
        document
            .sessions
            .push(SessionRecord::new(NewSession::new("alice"), Utc::now()));
        document.total_connections = 1;
        document.recompute_active();

        repo.save(&document).await.unwrap();
        let loaded = repo.load().await.unwrap();

        assert_eq!(loaded, document);
        assert!(!repo.staging_path().exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, b"{not json").unwrap();

        let repo = SessionRepository::new(path);

        assert!(repo.load().await.is_err());
    }
}
