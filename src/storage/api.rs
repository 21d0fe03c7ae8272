//! Recent recipient storage api.

use crate::{error::StorageError, types::RecentRecipient};
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for `Result<T, StorageError>`
pub type Result<T> = core::result::Result<T, StorageError>;

/// Storage API.
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Reads the recent recipients, oldest first.
    async fn read_recipients(&self) -> Result<Vec<RecentRecipient>>;

    /// Replaces the recent recipients.
    async fn write_recipients(&self, recipients: &[RecentRecipient]) -> Result<()>;
}
