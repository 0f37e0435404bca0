//! JSON Lines persistence sink.
//!
//! Each record kind is appended to its own file under the data directory,
//! one JSON object per line.

use super::{ActivitySpan, IdleEvent, KeystrokeBatch, PersistenceSink, StorageError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const ACTIVITY_FILE: &str = "activity.jsonl";
pub const KEYSTROKES_FILE: &str = "keystrokes.jsonl";
pub const IDLE_FILE: &str = "idle.jsonl";

/// A single append-only JSON Lines file.
#[derive(Debug)]
struct JsonlFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn append<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let _guard = self.lock.lock();
        let file = std::fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

/// Sink writing `activity.jsonl`, `keystrokes.jsonl` and `idle.jsonl`.
#[derive(Debug)]
pub struct JsonlSink {
    activity: JsonlFile,
    keystrokes: JsonlFile,
    idle: JsonlFile,
}

impl JsonlSink {
    /// Open a sink in `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            activity: JsonlFile::new(dir.join(ACTIVITY_FILE)),
            keystrokes: JsonlFile::new(dir.join(KEYSTROKES_FILE)),
            idle: JsonlFile::new(dir.join(IDLE_FILE)),
        })
    }

    pub fn read_activity(&self) -> Result<Vec<ActivitySpan>, StorageError> {
        self.activity.read_all()
    }

    pub fn read_keystrokes(&self) -> Result<Vec<KeystrokeBatch>, StorageError> {
        self.keystrokes.read_all()
    }

    pub fn read_idle(&self) -> Result<Vec<IdleEvent>, StorageError> {
        self.idle.read_all()
    }
}

impl PersistenceSink for JsonlSink {
    fn append_activity(&self, span: &ActivitySpan) -> Result<(), StorageError> {
        self.activity.append(span)
    }

    fn append_keystrokes(&self, batch: &KeystrokeBatch) -> Result<(), StorageError> {
        self.keystrokes.append(batch)
    }

    fn append_idle(&self, event: &IdleEvent) -> Result<(), StorageError> {
        self.idle.append(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlushTrigger, KeystrokeToken};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::open(dir.path()).unwrap();

        for secs in [1.5, 2.0] {
            sink.append_idle(&IdleEvent {
                detected_at: Utc::now(),
                duration_secs: secs,
            })
            .unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join(IDLE_FILE)).unwrap();
        assert_eq!(content.lines().count(), 2);

        let events = sink.read_idle().unwrap();
        assert_eq!(events[0].duration_secs, 1.5);
        assert_eq!(events[1].duration_secs, 2.0);
    }

    #[test]
    fn test_record_kinds_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::open(dir.path().join("nested")).unwrap();

        sink.append_keystrokes(&KeystrokeBatch {
            session_id: Uuid::new_v4(),
            flushed_at: Utc::now(),
            trigger: FlushTrigger::Timer,
            tokens: vec![KeystrokeToken::Redacted],
        })
        .unwrap();

        assert_eq!(sink.read_keystrokes().unwrap().len(), 1);
        assert!(sink.read_activity().unwrap().is_empty());
        assert!(!dir.path().join("nested").join(ACTIVITY_FILE).exists());
    }
}
