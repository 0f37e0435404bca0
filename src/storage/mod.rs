//! Persistence collaborators of the capture pipeline.
//!
//! The pipeline only ever appends. Activity spans, keystroke batches and idle
//! events go to a [`PersistenceSink`] with no transactional linkage between
//! them; credential records go to a separate [`SecureStore`].

pub mod jsonl;
pub mod memory;
pub mod records;
pub mod sealed;

use std::sync::Arc;

pub use jsonl::JsonlSink;
pub use memory::{MemorySink, MemoryStore};
pub use records::{
    ActivitySpan, CredentialRecord, FlushTrigger, IdleEvent, KeystrokeBatch, KeystrokeToken,
    PASSWORD_PLACEHOLDER, REDACTION_TOKEN,
};
pub use sealed::SealedFileStore;

/// Storage errors. The pipeline logs these and drops the record.
#[derive(Debug)]
pub enum StorageError {
    IoError(String),
    SerializeError(String),
    SealError(String),
    KeyError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "IO error: {e}"),
            StorageError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            StorageError::SealError(e) => write!(f, "Seal error: {e}"),
            StorageError::KeyError(e) => write!(f, "Key error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializeError(e.to_string())
    }
}

/// Durable destination for activity, keystroke and idle records.
pub trait PersistenceSink: Send + Sync {
    fn append_activity(&self, span: &ActivitySpan) -> Result<(), StorageError>;
    fn append_keystrokes(&self, batch: &KeystrokeBatch) -> Result<(), StorageError>;
    fn append_idle(&self, event: &IdleEvent) -> Result<(), StorageError>;
}

/// Destination for sealed credential records.
pub trait SecureStore: Send + Sync {
    fn append(&self, record: &CredentialRecord) -> Result<(), StorageError>;
}

pub type SharedSink = Arc<dyn PersistenceSink>;
pub type SharedSecureStore = Arc<dyn SecureStore>;
