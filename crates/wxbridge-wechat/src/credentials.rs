// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account credential blobs on disk, one `<id>.json` file each.

use std::path::{Path, PathBuf};

use tracing::debug;
use wxbridge_core::BridgeError;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Creates the credential directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), BridgeError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BridgeError::persistence(&self.dir, e))
    }

    /// Loads the blob for `id`; `Ok(None)` when no file exists.
    pub async fn load(&self, id: &str) -> Result<Option<serde_json::Value>, BridgeError> {
        let path = self.path_for(id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::persistence(path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| BridgeError::persistence(path, e))
    }

    /// Writes the blob for `id` verbatim.
    pub async fn save(&self, id: &str, blob: &serde_json::Value) -> Result<(), BridgeError> {
        self.ensure_dir().await?;
        let path = self.path_for(id);
        let text = serde_json::to_string(blob).map_err(|e| BridgeError::persistence(&path, e))?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| BridgeError::persistence(&path, e))?;
        debug!(path = %path.display(), "credentials saved");
        Ok(())
    }
}
