//! Recipient storage implementation in-memory. For testing only.

use super::{StorageApi, api::Result};
use crate::types::RecentRecipient;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// [`StorageApi`] implementation in-memory. Used for testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    recipients: RwLock<Vec<RecentRecipient>>,
}

impl InMemoryStorage {
    /// Creates a store seeded with `recipients`.
    pub fn with_recipients(recipients: Vec<RecentRecipient>) -> Self {
        Self { recipients: RwLock::new(recipients) }
    }
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn read_recipients(&self) -> Result<Vec<RecentRecipient>> {
        Ok(self.recipients.read().await.clone())
    }

    async fn write_recipients(&self, recipients: &[RecentRecipient]) -> Result<()> {
        *self.recipients.write().await = recipients.to_vec();
        Ok(())
    }
}
