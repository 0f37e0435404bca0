//! In-memory sink and store, used by replays and tests.

use super::{
    ActivitySpan, CredentialRecord, IdleEvent, KeystrokeBatch, PersistenceSink, SecureStore,
    StorageError,
};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct MemorySink {
    activity: Mutex<Vec<ActivitySpan>>,
    keystrokes: Mutex<Vec<KeystrokeBatch>>,
    idle: Mutex<Vec<IdleEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(&self) -> Vec<ActivitySpan> {
        self.activity.lock().clone()
    }

    pub fn keystrokes(&self) -> Vec<KeystrokeBatch> {
        self.keystrokes.lock().clone()
    }

    pub fn idle(&self) -> Vec<IdleEvent> {
        self.idle.lock().clone()
    }

    /// All flushed token texts, in flush order.
    pub fn flushed_tokens(&self) -> Vec<String> {
        self.keystrokes
            .lock()
            .iter()
            .flat_map(|batch| batch.tokens.iter().map(|t| t.as_str().to_string()))
            .collect()
    }
}

impl PersistenceSink for MemorySink {
    fn append_activity(&self, span: &ActivitySpan) -> Result<(), StorageError> {
        self.activity.lock().push(span.clone());
        Ok(())
    }

    fn append_keystrokes(&self, batch: &KeystrokeBatch) -> Result<(), StorageError> {
        self.keystrokes.lock().push(batch.clone());
        Ok(())
    }

    fn append_idle(&self, event: &IdleEvent) -> Result<(), StorageError> {
        self.idle.lock().push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CredentialRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CredentialRecord> {
        self.records.lock().clone()
    }
}

impl SecureStore for MemoryStore {
    fn append(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
