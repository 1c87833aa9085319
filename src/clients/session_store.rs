use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::models::auth::Session;
use crate::utils::errors::AppResult;

/// Persistência da sessão em um arquivo JSON
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sessão salva; arquivo ausente ou corrompido conta como "sem sessão"
    pub async fn load(&self) -> AppResult<Option<Session>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!("📂 Sessão restaurada de {}", self.path.display());
                Ok(Some(session))
            }
            Err(e) => {
                warn!("⚠️ Sessão salva inválida em {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, raw).await?;
        debug!("💾 Sessão salva em {}", self.path.display());
        Ok(())
    }

    pub async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
