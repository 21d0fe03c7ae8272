//! Recipient storage backed by a JSON file.

use super::{StorageApi, api::Result};
use crate::{constants::RECIPIENTS_KEY, types::RecentRecipient};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::{io::ErrorKind, path::PathBuf};
use tracing::trace;

/// [`StorageApi`] implementation persisting to a JSON object on disk.
///
/// The list is stored under a fixed key so the file can hold other entries next to it, which are
/// preserved on write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_object(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Recipient file does not exist yet");
                Ok(Map::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl StorageApi for FileStorage {
    async fn read_recipients(&self) -> Result<Vec<RecentRecipient>> {
        match self.read_object().await?.remove(RECIPIENTS_KEY) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_recipients(&self, recipients: &[RecentRecipient]) -> Result<()> {
        let mut object = self.read_object().await?;
        object.insert(RECIPIENTS_KEY.to_string(), serde_json::to_value(recipients)?);
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&object)?).await?;
        Ok(())
    }
}
