/// Errors returned by a [`RecipientStore`](crate::storage::RecipientStore).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("recipient store i/o failed")]
    Io(#[from] std::io::Error),
    /// A (de)serialization error occurred.
    #[error("a deserialization error occurred")]
    SerdeError(#[from] serde_json::Error),
}
