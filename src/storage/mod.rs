//! Recent recipient storage

mod api;
pub use api::StorageApi;
mod file;
pub use file::FileStorage;
mod memory;
pub use memory::InMemoryStorage;

use crate::types::RecentRecipient;
use async_trait::async_trait;
use std::{path::PathBuf, sync::Arc};

/// Recent recipient storage interface.
#[derive(Debug, Clone)]
pub struct RecipientStore {
    inner: Arc<dyn StorageApi>,
}

impl RecipientStore {
    /// Create [`RecipientStore`] with a in-memory backend. Used for testing only.
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(InMemoryStorage::default()) }
    }

    /// Create [`RecipientStore`] persisting to a JSON file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { inner: Arc::new(FileStorage::new(path)) }
    }

    /// Create [`RecipientStore`] over any backend.
    pub fn new(inner: Arc<dyn StorageApi>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageApi for RecipientStore {
    async fn read_recipients(&self) -> api::Result<Vec<RecentRecipient>> {
        self.inner.read_recipients().await
    }

    async fn write_recipients(&self, recipients: &[RecentRecipient]) -> api::Result<()> {
        self.inner.write_recipients(recipients).await
    }
}
